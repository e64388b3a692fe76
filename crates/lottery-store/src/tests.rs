use std::num::NonZeroU32;

use lottery_core::event::{Event, EventStatus, WaitingListCap};
use lottery_core::profile::Profile;
use lottery_core::roster::WaitingRecord;
use lottery_core::{EventId, Timestamp, UserId};
use lottery_util_error::BoxedErrorResult;
use tempfile::tempdir;

use crate::{Batch, BatchOp, Store};

fn build_event(organizer_id: UserId) -> Event {
    Event {
        id: EventId::new(),
        name: "Community Cleanup".into(),
        description: "Bring gloves".into(),
        organizer_id,
        occurrences: vec![Timestamp::from_millis(1_000)],
        location: "Riverside Park".into(),
        registration_start: Timestamp::from_millis(0),
        registration_end: Timestamp::from_millis(500),
        capacity: NonZeroU32::new(10).unwrap(),
        waiting_list_cap: WaitingListCap::Unlimited,
        geolocation_required: false,
        poster_ref: None,
        qr_payload_id: None,
        event_type: "cleanup".into(),
        status: EventStatus::Open,
        has_drawn: false,
    }
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn put_and_get_event_roundtrips() -> BoxedErrorResult<()> {
    let store = Store::new_in_memory().await?;
    let organizer = UserId::new();
    let event = build_event(organizer);

    store.put_event(event.clone()).await?;
    let loaded = store.get_event(event.id).await?;

    assert_eq!(loaded, Some(event));
    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn get_missing_event_returns_none() -> BoxedErrorResult<()> {
    let store = Store::new_in_memory().await?;
    assert_eq!(store.get_event(EventId::new()).await?, None);
    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn list_events_by_organizer_filters_correctly() -> BoxedErrorResult<()> {
    let store = Store::new_in_memory().await?;
    let (org_a, org_b) = (UserId::new(), UserId::new());
    let event_a = build_event(org_a);
    let event_b = build_event(org_b);

    store.put_event(event_a.clone()).await?;
    store.put_event(event_b).await?;

    let for_a = store.list_events_by_organizer(org_a).await?;
    assert_eq!(for_a, vec![event_a]);
    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn waiting_roster_scoped_per_event_and_collection_group_across_events() -> BoxedErrorResult<()> {
    let store = Store::new_in_memory().await?;
    let user = UserId::new();
    let (event_a, event_b) = (EventId::new(), EventId::new());

    let mut batch = Batch::new();
    batch.push(BatchOp::PutWaiting(
        event_a,
        WaitingRecord {
            user_id: user,
            joined_at: Timestamp::from_millis(1),
            location: None,
        },
    ));
    batch.push(BatchOp::PutWaiting(
        event_b,
        WaitingRecord {
            user_id: user,
            joined_at: Timestamp::from_millis(2),
            location: None,
        },
    ));
    store.commit_batch(batch).await?;

    let roster_a = store.load_waiting(event_a).await?;
    assert_eq!(roster_a.count(), 1);
    assert!(roster_a.contains(user));

    let across_events = store.find_waiting_for_user(user).await?;
    assert_eq!(across_events.len(), 2);
    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn draw_lock_rejects_concurrent_acquisition() -> BoxedErrorResult<()> {
    let store = Store::new_in_memory().await?;
    let event_id = EventId::new();
    let now = Timestamp::now();

    store.try_acquire_draw_lock(event_id, now).await?;
    let second = store.try_acquire_draw_lock(event_id, now).await;
    assert!(second.is_err());

    store.release_draw_lock(event_id).await?;
    store.try_acquire_draw_lock(event_id, now).await?;
    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn batch_exceeding_bound_is_rejected() -> BoxedErrorResult<()> {
    let store = Store::new_in_memory().await?;
    let mut batch = Batch::new();
    for _ in 0..(crate::MAX_BATCH_OPS + 1) {
        batch.push(BatchOp::DeleteEvent(EventId::new()));
    }

    let result = store.commit_batch(batch).await;
    assert!(result.is_err());
    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn profiles_persist_across_store_reopen() -> BoxedErrorResult<()> {
    let dir = tempdir()?;
    let path = dir.path().join("store.redb");
    let user_id = UserId::new();

    {
        let store = Store::open(&path).await?;
        store.put_profile(Profile::new(user_id, "Ada")).await?;
    }

    let store = Store::open(&path).await?;
    let profile = store.get_profile(user_id).await?;
    assert_eq!(profile.map(|p| p.display_name), Some("Ada".to_string()));
    Ok(())
}
