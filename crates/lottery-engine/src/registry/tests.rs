use lottery_core::event::EventStatus;
use lottery_core::{Timestamp, UserId};
use lottery_util_error::BoxedErrorResult;

use crate::registry::Location;
use crate::test_support::{build_event, engine_with_store};

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn create_event_defaults_to_draft_unless_published() -> BoxedErrorResult<()> {
    let (engine, _store) = engine_with_store().await;
    let organizer = UserId::new();

    let draft = engine.create_event(build_event(organizer), false).await?;
    assert_eq!(draft.status, EventStatus::Draft);

    let open = engine.create_event(build_event(organizer), true).await?;
    assert_eq!(open.status, EventStatus::Open);
    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn update_event_forbids_organizer_change() -> BoxedErrorResult<()> {
    let (engine, _store) = engine_with_store().await;
    let organizer = UserId::new();
    let event = engine.create_event(build_event(organizer), true).await?;

    let other = UserId::new();
    let result = engine.update_event(event.id, |e| e.organizer_id = other).await;
    assert!(result.is_err());
    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn update_event_forbids_capacity_change_after_draw() -> BoxedErrorResult<()> {
    let (engine, _store) = engine_with_store().await;
    let organizer = UserId::new();
    let mut seed = build_event(organizer);
    seed.has_drawn = true;
    let event = engine.create_event(seed, true).await?;

    let result = engine.update_event(event.id, |e| e.capacity = std::num::NonZeroU32::new(9).unwrap()).await;
    assert!(result.is_err());
    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn join_waiting_list_is_idempotent_and_rejects_when_closed() -> BoxedErrorResult<()> {
    let (engine, _store) = engine_with_store().await;
    let organizer = UserId::new();
    let event = engine.create_event(build_event(organizer), true).await?;
    let user = UserId::new();
    let now = Timestamp::from_millis(100);

    assert!(engine.join_waiting_list(event.id, user, now, None).await?);
    assert!(!engine.join_waiting_list(event.id, user, now, None).await?);

    let waiting = engine.read_waiting(event.id).await?;
    assert_eq!(waiting.count(), 1);

    let mut closed = engine.get_event(event.id).await?;
    closed.status = EventStatus::Closed;
    engine.store().put_event(closed).await?;

    let other = UserId::new();
    let result = engine.join_waiting_list(event.id, other, now, None).await;
    assert!(result.is_err());
    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn join_waiting_list_respects_capacity_cap() -> BoxedErrorResult<()> {
    let (engine, _store) = engine_with_store().await;
    let organizer = UserId::new();
    let mut seed = build_event(organizer);
    seed.waiting_list_cap = lottery_core::event::WaitingListCap::capped(1).unwrap();
    let event = engine.create_event(seed, true).await?;
    let now = Timestamp::from_millis(100);

    assert!(engine.join_waiting_list(event.id, UserId::new(), now, None).await?);
    let result = engine.join_waiting_list(event.id, UserId::new(), now, None).await;
    assert!(result.is_err());
    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn leave_waiting_list_is_idempotent() -> BoxedErrorResult<()> {
    let (engine, _store) = engine_with_store().await;
    let organizer = UserId::new();
    let event = engine.create_event(build_event(organizer), true).await?;
    let user = UserId::new();
    let now = Timestamp::from_millis(100);

    engine.join_waiting_list(event.id, user, now, None).await?;
    engine.leave_waiting_list(event.id, user).await?;
    engine.leave_waiting_list(event.id, user).await?;
    assert_eq!(engine.read_waiting(event.id).await?.count(), 0);
    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn dashboard_for_user_aggregates_across_rosters() -> BoxedErrorResult<()> {
    let (engine, _store) = engine_with_store().await;
    let organizer = UserId::new();
    let event_a = engine.create_event(build_event(organizer), true).await?;
    let event_b = engine.create_event(build_event(organizer), true).await?;
    let user = UserId::new();
    let now = Timestamp::from_millis(100);

    engine.join_waiting_list(event_a.id, user, now, None).await?;
    engine.join_waiting_list(event_b.id, user, now, None).await?;

    let dashboard = engine.dashboard_for_user(user).await?;
    assert_eq!(dashboard.waiting.len(), 2);
    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn location_is_captured_on_join() -> BoxedErrorResult<()> {
    let (engine, _store) = engine_with_store().await;
    let organizer = UserId::new();
    let event = engine.create_event(build_event(organizer), true).await?;
    let user = UserId::new();
    let now = Timestamp::from_millis(100);
    let location = Location {
        point: lottery_core::event::GeoPoint { latitude: 1.0, longitude: 2.0 },
        captured_at: now,
    };

    engine.join_waiting_list(event.id, user, now, Some(location)).await?;
    let waiting = engine.read_waiting(event.id).await?;
    assert!(waiting.get(user).unwrap().location.is_some());
    Ok(())
}
