use lottery_core::{Timestamp, UserId};
use lottery_util_error::BoxedErrorResult;

use crate::cascade::NeverCancel;
use crate::test_support::{build_event, build_profile, engine_with_store};

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn delete_profile_reaps_every_roster_then_the_profile_document() -> BoxedErrorResult<()> {
    let (engine, store) = engine_with_store().await;
    let organizer = UserId::new();
    let event_a = engine.create_event(build_event(organizer), true).await?;
    let event_b = engine.create_event(build_event(organizer), true).await?;
    let user = UserId::new();
    let now = Timestamp::from_millis(100);

    store.put_profile(build_profile(user, "target")).await?;
    engine.join_waiting_list(event_a.id, user, now, None).await?;
    engine.join_waiting_list(event_b.id, user, now, None).await?;

    let outcome = engine.delete_profile(user, &NeverCancel).await?;
    assert!(outcome.completed);
    assert!(outcome.profile_deleted);

    assert_eq!(engine.dashboard_for_user(user).await?.waiting.len(), 0);
    assert!(store.get_profile(user).await?.is_none());
    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn delete_profile_honors_cancellation_before_the_profile_commit_point() -> BoxedErrorResult<()> {
    let (engine, store) = engine_with_store().await;
    let organizer = UserId::new();
    let event = engine.create_event(build_event(organizer), true).await?;
    let user = UserId::new();
    let now = Timestamp::from_millis(100);

    store.put_profile(build_profile(user, "target")).await?;
    engine.join_waiting_list(event.id, user, now, None).await?;

    let always_cancel = || true;
    let outcome = engine.delete_profile(user, &always_cancel).await?;
    assert!(!outcome.completed);
    assert!(!outcome.profile_deleted);
    assert!(store.get_profile(user).await?.is_some());
    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn delete_organizer_reaps_events_before_the_organizer_profile() -> BoxedErrorResult<()> {
    let (engine, store) = engine_with_store().await;
    let organizer = UserId::new();
    store.put_profile(build_profile(organizer, "organizer")).await?;
    let event = engine.create_event(build_event(organizer), true).await?;
    let user = UserId::new();
    let now = Timestamp::from_millis(100);
    store.put_profile(build_profile(user, "entrant")).await?;
    engine.join_waiting_list(event.id, user, now, None).await?;

    let outcome = engine.delete_organizer(organizer, &NeverCancel).await?;
    assert!(outcome.completed);
    assert_eq!(outcome.events_reaped, 1);
    assert!(store.get_event(event.id).await?.is_none());
    assert!(store.get_profile(organizer).await?.is_none());
    assert_eq!(engine.dashboard_for_user(user).await?.waiting.len(), 0);
    Ok(())
}
