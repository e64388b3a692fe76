mod cli;

use std::io;

use cli::{BroadcastCmd, DrawCmd, EventCmd, OptsCmd, ProfileCmd, ResponseCmd, RosterArg, WaitingCmd};
use clap::Parser;
use lottery_core::event::{Event, GeoPoint, WaitingListCap};
use lottery_core::notification::Sender;
use lottery_core::{EventId, Profile, Timestamp, UserId};
use lottery_engine::broadcast::{LoggingPushChannel, Roster};
use lottery_engine::cascade::NeverCancel;
use lottery_engine::registry::Location;
use lottery_engine::{Engine, EngineError};
use lottery_store::{Store, StoreError};
use snafu::{FromString, ResultExt, Snafu, Whatever};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

pub const LOG_TARGET: &str = "lottery::cli";

#[derive(Debug, Snafu)]
pub enum CliError {
    #[snafu(display("store error: {source}"))]
    Store { source: StoreError },
    #[snafu(transparent)]
    Engine { source: EngineError },
    #[snafu(display("miscellaneous error: {source}"))]
    Whatever { source: Whatever },
}

pub type CliResult<T> = std::result::Result<T, CliError>;

#[snafu::report]
#[tokio::main]
async fn main() -> CliResult<()> {
    init_logging().context(WhateverSnafu)?;

    let opts = cli::Opts::parse();
    let store = Store::open(&opts.global.db_path).await.context(StoreSnafu)?;
    let engine = Engine::with_default_config(store);

    let value = handle_cmd(&engine, opts.cmd).await?;
    println!("{}", serde_json::to_string_pretty(&value).expect("json values never fail to serialize"));
    Ok(())
}

async fn handle_cmd(engine: &Engine, cmd: OptsCmd) -> CliResult<serde_json::Value> {
    match cmd {
        OptsCmd::GenUserId => Ok(serde_json::json!({ "user_id": UserId::new().to_string() })),

        OptsCmd::Event(cmd) => handle_event_cmd(engine, cmd).await,
        OptsCmd::Profile(cmd) => handle_profile_cmd(engine, cmd).await,
        OptsCmd::Waiting(cmd) => handle_waiting_cmd(engine, cmd).await,
        OptsCmd::Draw(cmd) => handle_draw_cmd(engine, cmd).await,
        OptsCmd::Response(cmd) => handle_response_cmd(engine, cmd).await,
        OptsCmd::Broadcast(cmd) => handle_broadcast_cmd(engine, cmd).await,

        OptsCmd::DeleteProfile { user_id } => {
            let outcome = engine.delete_profile(user_id, &NeverCancel).await?;
            Ok(serde_json::json!({
                "completed": outcome.completed,
                "batches_committed": outcome.batches_committed,
            }))
        }
        OptsCmd::DeleteOrganizer { organizer_id } => {
            let outcome = engine.delete_organizer(organizer_id, &NeverCancel).await?;
            Ok(serde_json::json!({
                "completed": outcome.completed,
                "events_reaped": outcome.events_reaped,
                "batches_committed": outcome.batches_committed,
            }))
        }
        OptsCmd::Dashboard { user_id } => {
            let dashboard = engine.dashboard_for_user(user_id).await?;
            Ok(serde_json::json!({
                "waiting": dashboard.waiting.len(),
                "response_pending": dashboard.response_pending.len(),
                "in_event": dashboard.in_event.len(),
                "cancelled": dashboard.cancelled.len(),
            }))
        }
    }
}

async fn handle_event_cmd(engine: &Engine, cmd: EventCmd) -> CliResult<serde_json::Value> {
    match cmd {
        EventCmd::Create {
            organizer_id,
            name,
            description,
            location,
            event_type,
            registration_start,
            registration_end,
            occurrences,
            capacity,
            waiting_list_cap,
            publish,
        } => {
            let occurrences =
                if occurrences.is_empty() { vec![Timestamp::from_millis(registration_end)] } else { occurrences.into_iter().map(Timestamp::from_millis).collect() };
            let event = Event {
                id: EventId::new(),
                name,
                description,
                organizer_id,
                occurrences,
                location,
                registration_start: Timestamp::from_millis(registration_start),
                registration_end: Timestamp::from_millis(registration_end),
                capacity,
                waiting_list_cap: waiting_list_cap.and_then(WaitingListCap::capped).unwrap_or(WaitingListCap::Unlimited),
                geolocation_required: false,
                poster_ref: None,
                qr_payload_id: None,
                event_type,
                status: lottery_core::EventStatus::Draft,
                has_drawn: false,
            };
            let created = engine.create_event(event, publish).await?;
            Ok(serde_json::to_value(created).expect("Event serializes"))
        }
        EventCmd::Publish { event_id } => {
            let event = engine.update_event(event_id, |e| e.status = lottery_core::EventStatus::Open).await?;
            Ok(serde_json::to_value(event).expect("Event serializes"))
        }
        EventCmd::Cancel { event_id } => {
            let event = engine.update_event(event_id, |e| e.status = lottery_core::EventStatus::Cancelled).await?;
            Ok(serde_json::to_value(event).expect("Event serializes"))
        }
        EventCmd::Get { event_id } => Ok(serde_json::to_value(engine.get_event(event_id).await?).expect("Event serializes")),
        EventCmd::List { organizer_id, for_entrant_as_of } => {
            let events = if let Some(organizer_id) = organizer_id {
                engine.list_events_by_organizer(organizer_id).await?
            } else if let Some(now) = for_entrant_as_of {
                engine.list_for_entrant(Timestamp::from_millis(now)).await?
            } else {
                engine.list_all_events().await?
            };
            Ok(serde_json::to_value(events).expect("events serialize"))
        }
        EventCmd::Delete { event_id } => {
            engine.delete_event(event_id).await?;
            Ok(serde_json::Value::Bool(true))
        }
    }
}

async fn handle_profile_cmd(engine: &Engine, cmd: ProfileCmd) -> CliResult<serde_json::Value> {
    match cmd {
        ProfileCmd::Create { user_id, display_name } => {
            let profile = Profile::new(user_id, display_name);
            engine.store().put_profile(profile.clone()).await.context(StoreSnafu)?;
            Ok(serde_json::to_value(profile).expect("Profile serializes"))
        }
        ProfileCmd::Get { user_id } => {
            let profile = engine.store().get_profile(user_id).await.context(StoreSnafu)?;
            Ok(serde_json::to_value(profile).expect("Profile serializes"))
        }
        ProfileCmd::SetPushToken { user_id, push_token } => {
            let mut profile = engine.store().get_profile(user_id).await.context(StoreSnafu)?.unwrap_or_else(|| Profile::new(user_id, "unknown"));
            profile.push_token = Some(push_token);
            engine.store().put_profile(profile.clone()).await.context(StoreSnafu)?;
            Ok(serde_json::to_value(profile).expect("Profile serializes"))
        }
        ProfileCmd::SetNotificationEnabled { user_id, enabled } => {
            let mut profile = engine.store().get_profile(user_id).await.context(StoreSnafu)?.unwrap_or_else(|| Profile::new(user_id, "unknown"));
            profile.notification_enabled = enabled;
            engine.store().put_profile(profile.clone()).await.context(StoreSnafu)?;
            Ok(serde_json::to_value(profile).expect("Profile serializes"))
        }
    }
}

async fn handle_waiting_cmd(engine: &Engine, cmd: WaitingCmd) -> CliResult<serde_json::Value> {
    match cmd {
        WaitingCmd::Join { event_id, user_id, now, latitude, longitude } => {
            let location = latitude.zip(longitude).map(|(latitude, longitude)| Location {
                point: GeoPoint { latitude, longitude },
                captured_at: Timestamp::from_millis(now),
            });
            let admitted = engine.join_waiting_list(event_id, user_id, Timestamp::from_millis(now), location).await?;
            Ok(serde_json::json!({ "admitted": admitted }))
        }
        WaitingCmd::Leave { event_id, user_id } => {
            engine.leave_waiting_list(event_id, user_id).await?;
            Ok(serde_json::Value::Bool(true))
        }
        WaitingCmd::List { event_id } => {
            let waiting = engine.read_waiting(event_id).await?;
            Ok(serde_json::json!({ "count": waiting.count(), "user_ids": waiting.user_ids().map(|u| u.to_string()).collect::<Vec<_>>() }))
        }
    }
}

async fn handle_draw_cmd(engine: &Engine, cmd: DrawCmd) -> CliResult<serde_json::Value> {
    match cmd {
        DrawCmd::Initial { event_id, winners, now, seed } => {
            let outcome = engine.initial_draw(event_id, winners, Timestamp::from_millis(now), seed).await?;
            Ok(draw_outcome_json(&outcome))
        }
        DrawCmd::Replacement { event_id, count, now, seed } => {
            let outcome = engine.replacement_draw(event_id, count, Timestamp::from_millis(now), seed).await?;
            Ok(draw_outcome_json(&outcome))
        }
        DrawCmd::Candidates { event_id } => {
            let candidates = engine.candidates_available_for_replacement(event_id).await?;
            Ok(serde_json::json!({ "candidates": candidates.iter().map(|u| u.to_string()).collect::<Vec<_>>() }))
        }
    }
}

fn draw_outcome_json(outcome: &lottery_engine::lottery::DrawOutcome) -> serde_json::Value {
    serde_json::json!({
        "winners": outcome.winners.iter().map(|u| u.to_string()).collect::<Vec<_>>(),
        "losers": outcome.losers.iter().map(|u| u.to_string()).collect::<Vec<_>>(),
        "deadline": outcome.deadline.as_millis(),
    })
}

async fn handle_response_cmd(engine: &Engine, cmd: ResponseCmd) -> CliResult<serde_json::Value> {
    match cmd {
        ResponseCmd::Accept { event_id, user_id, now } => {
            engine.accept(event_id, user_id, Timestamp::from_millis(now), None).await?;
            Ok(serde_json::Value::Bool(true))
        }
        ResponseCmd::Decline { event_id, user_id, now } => {
            engine.decline(event_id, user_id, Timestamp::from_millis(now)).await?;
            Ok(serde_json::Value::Bool(true))
        }
        ResponseCmd::OrganizerCancel { event_id, user_id, now } => {
            engine.organizer_cancel(event_id, user_id, Timestamp::from_millis(now)).await?;
            Ok(serde_json::Value::Bool(true))
        }
        ResponseCmd::Sweep { now } => {
            let swept = engine.run_deadline_sweep(Timestamp::from_millis(now)).await?;
            Ok(serde_json::json!({ "swept": swept }))
        }
    }
}

async fn handle_broadcast_cmd(engine: &Engine, cmd: BroadcastCmd) -> CliResult<serde_json::Value> {
    match cmd {
        BroadcastCmd::ToRoster { event_id, roster, sender_id, message } => {
            let roster = match roster {
                RosterArg::Waiting => Roster::Waiting,
                RosterArg::ResponsePending => Roster::ResponsePending,
                RosterArg::InEvent => Roster::InEvent,
                RosterArg::Cancelled => Roster::Cancelled,
            };
            let outcome = engine.broadcast_to_roster(event_id, roster, Sender::User(sender_id), message, &LoggingPushChannel).await?;
            Ok(serde_json::json!({
                "sent": outcome.sent,
                "failed": outcome.failed,
                "excluded": outcome.excluded,
            }))
        }
    }
}

pub fn init_logging() -> Result<(), Whatever> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy())
        .try_init()
        .map_err(|_| Whatever::without_source("failed to initialize logging".to_string()))?;
    Ok(())
}
