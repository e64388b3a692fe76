//! The Notification Broadcaster (§4.6): recipient filtering, payload
//! construction, log-before-delivery persistence, and delivery over a
//! pluggable [`PushChannel`].

use std::sync::Mutex;

use lottery_core::ids::NotificationLogId;
use lottery_core::notification::{NotificationLog, NotificationType, Sender};
use lottery_core::roster::RosterSet;
use lottery_core::{EventId, Timestamp, UserId};
use tracing::{info, warn};

use crate::{Engine, EngineResult, LOG_TARGET};

/// A single recipient's payload (§4.6 "Payload contract").
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationPayload {
    pub notification_type: NotificationType,
    pub event_id: EventId,
    pub event_name: String,
    pub message: String,
    pub deadline: Option<Timestamp>,
}

/// The external delivery interface (§6 "Push notification provider").
/// Implementations own their own retry/backoff policy; the broadcaster
/// only records whether a send succeeded.
pub trait PushChannel: Send + Sync {
    fn send(&self, recipient: UserId, push_token: &str, payload: &NotificationPayload) -> bool;
}

/// Delivers via `tracing`, the teacher's stand-in for the absent real
/// provider integration (§6 "external systems are named, not built").
pub struct LoggingPushChannel;

impl PushChannel for LoggingPushChannel {
    fn send(&self, recipient: UserId, push_token: &str, payload: &NotificationPayload) -> bool {
        info!(
            target: LOG_TARGET,
            %recipient,
            push_token,
            ?payload.notification_type,
            event_id = %payload.event_id,
            "Delivering push notification",
        );
        true
    }
}

/// A test double recording every delivery attempt in order.
#[derive(Default)]
pub struct RecordingPushChannel {
    sent: Mutex<Vec<(UserId, NotificationPayload)>>,
}

impl RecordingPushChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(UserId, NotificationPayload)> {
        self.sent.lock().expect("lock poisoned").clone()
    }
}

impl PushChannel for RecordingPushChannel {
    fn send(&self, recipient: UserId, _push_token: &str, payload: &NotificationPayload) -> bool {
        self.sent.lock().expect("lock poisoned").push((recipient, payload.clone()));
        true
    }
}

/// The result of one broadcast (§4.6 "delivery failures do not fail the
/// call"; only the log write is a hard failure).
#[derive(Debug, Default)]
pub struct BroadcastOutcome {
    pub sent: usize,
    pub failed: usize,
    pub excluded: usize,
    pub errors: Vec<(UserId, String)>,
}

#[derive(Debug, Clone, Copy)]
pub enum Roster {
    Waiting,
    ResponsePending,
    InEvent,
    Cancelled,
}

/// Everything a [`Engine::broadcast`] call needs beyond the delivery
/// channel, bundled to keep the call site readable (§4.6 "Payload
/// contract" lists these as the inputs to one broadcast).
#[derive(Debug, Clone)]
pub struct BroadcastRequest {
    pub event_id: EventId,
    pub sender: Sender,
    pub recipients: Vec<UserId>,
    pub notification_type: NotificationType,
    pub message: String,
    pub deadline: Option<Timestamp>,
}

impl Engine {
    /// *Broadcast* (§4.6): persists the audit log first (a failure here
    /// aborts the whole call), then filters recipients and delivers.
    pub async fn broadcast(&self, request: BroadcastRequest, channel: &dyn PushChannel) -> EngineResult<BroadcastOutcome> {
        let BroadcastRequest { event_id, sender, recipients, notification_type, message, deadline } = request;
        let event = self.get_event(event_id).await?;

        let log = NotificationLog {
            id: NotificationLogId::new(),
            sent_at: deadline.unwrap_or(event.registration_start),
            sender,
            event_id,
            recipients: recipients.clone(),
            message: message.clone(),
            notification_type,
        };
        self.store.put_notification_log(log).await?;

        let profiles = self.store.get_profiles(&recipients).await?;

        let mut outcome = BroadcastOutcome::default();
        for user_id in recipients {
            let Some(profile) = profiles.get(&user_id) else {
                outcome.excluded += 1;
                continue;
            };
            if !profile.notification_enabled && !notification_type.is_mandatory() {
                outcome.excluded += 1;
                continue;
            }
            let Some(push_token) = profile.push_token.as_deref() else {
                warn!(target: LOG_TARGET, %user_id, "Recipient has no push token, excluding from delivery");
                outcome.excluded += 1;
                continue;
            };

            let payload = NotificationPayload {
                notification_type,
                event_id,
                event_name: event.name.clone(),
                message: message.clone(),
                deadline: if notification_type.carries_deadline() { deadline } else { None },
            };

            if channel.send(user_id, push_token, &payload) {
                outcome.sent += 1;
            } else {
                outcome.failed += 1;
                outcome.errors.push((user_id, "push channel reported delivery failure".to_string()));
            }
        }

        info!(
            target: LOG_TARGET, %event_id, sent = outcome.sent, failed = outcome.failed, excluded = outcome.excluded,
            "Broadcast complete",
        );
        Ok(outcome)
    }

    /// Convenience wrapper (§4.6 `broadcastToRoster`): resolves a roster
    /// name to its membership and broadcasts an organizer message to it.
    pub async fn broadcast_to_roster(
        &self,
        event_id: EventId,
        roster: Roster,
        sender: Sender,
        message: String,
        channel: &dyn PushChannel,
    ) -> EngineResult<BroadcastOutcome> {
        let recipients = match roster {
            Roster::Waiting => recipients_of(self.store().load_waiting(event_id).await?),
            Roster::ResponsePending => recipients_of(self.store().load_response_pending(event_id).await?),
            Roster::InEvent => recipients_of(self.store().load_in_event(event_id).await?),
            Roster::Cancelled => recipients_of(self.store().load_cancelled(event_id).await?),
        };
        self.broadcast(
            BroadcastRequest {
                event_id,
                sender,
                recipients,
                notification_type: NotificationType::OrganizerMessage,
                message,
                deadline: None,
            },
            channel,
        )
        .await
    }
}

fn recipients_of<R: lottery_core::roster::RosterRecord + Clone>(set: RosterSet<R>) -> Vec<UserId> {
    set.user_ids().collect()
}
