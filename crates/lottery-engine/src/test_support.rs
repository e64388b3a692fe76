//! Shared test fixtures, mirroring `lottery-store`'s `tests.rs` builder.

#![cfg(test)]

use std::num::NonZeroU32;

use lottery_core::event::{Event, EventStatus, WaitingListCap};
use lottery_core::profile::Profile;
use lottery_core::{EventId, Timestamp, UserId};
use lottery_store::Store;

use crate::{Config, Engine};

pub fn build_event(organizer_id: UserId) -> Event {
    Event {
        id: EventId::new(),
        name: "Community Cleanup".into(),
        description: "Bring gloves".into(),
        organizer_id,
        occurrences: vec![Timestamp::from_millis(10_000)],
        location: "Riverside Park".into(),
        registration_start: Timestamp::from_millis(0),
        registration_end: Timestamp::from_millis(5_000),
        capacity: NonZeroU32::new(2).unwrap(),
        waiting_list_cap: WaitingListCap::Unlimited,
        geolocation_required: false,
        poster_ref: None,
        qr_payload_id: None,
        event_type: "cleanup".into(),
        status: EventStatus::Open,
        has_drawn: false,
    }
}

pub fn build_profile(user_id: UserId, name: &str) -> Profile {
    Profile::new(user_id, name)
}

pub async fn engine_with_store() -> (Engine, Store) {
    let store = Store::new_in_memory().await.expect("in-memory store");
    let engine = Engine::new(store.clone(), Config::default());
    (engine, store)
}
