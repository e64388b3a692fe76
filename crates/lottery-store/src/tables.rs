//! Table definitions (§4.1, §6 "Persisted state layout").
//!
//! The four roster tables are keyed `(EventId, UserId)` so that a
//! collection-group query ("scans every subcollection with a given name
//! across all parents", §4.1) is simply a full range-scan of the table —
//! the table *is* the collection group, and a per-event scan is a
//! `(event_id, UserId::MIN)..=(event_id, UserId::MAX)`-shaped range.

#[macro_export]
macro_rules! def_table {
    ($(#[$outer:meta])*
        $name:ident : $k:ty => $v:ty) => {
        #[allow(unused)]
        $(#[$outer])*
        pub mod $name {
            use super::*;
            pub type Key = $k;
            pub type Value = $v;
            pub type Definition<'a> = redb_bincode::TableDefinition<'a, Key, Value>;
            pub trait ReadableTable: redb_bincode::ReadableTable<Key, Value> {}
            impl<RT> ReadableTable for RT where RT: redb_bincode::ReadableTable<Key, Value> {}
            pub type Table<'a> = redb_bincode::Table<'a, Key, Value>;
            pub const TABLE: Definition = redb_bincode::TableDefinition::new(stringify!($name));
        }
    };
}

use lottery_core::event::Event;
use lottery_core::notification::NotificationLog;
use lottery_core::profile::Profile;
use lottery_core::roster::{CancelledRecord, InEventRecord, ResponsePendingRecord, WaitingRecord};
use lottery_core::{EventId, NotificationLogId, UserId};

def_table! {
    /// The event document collection (`events/{eventId}`).
    events: EventId => Event
}

def_table! {
    /// The profile document collection (`profiles/{userId}`).
    profiles: UserId => Profile
}

def_table! {
    /// `events/{eventId}/waiting/{userId}`.
    waiting: (EventId, UserId) => WaitingRecord
}

def_table! {
    /// `events/{eventId}/responsePending/{userId}`.
    response_pending: (EventId, UserId) => ResponsePendingRecord
}

def_table! {
    /// `events/{eventId}/inEvent/{userId}`.
    in_event: (EventId, UserId) => InEventRecord
}

def_table! {
    /// `events/{eventId}/cancelled/{userId}`.
    cancelled: (EventId, UserId) => CancelledRecord
}

def_table! {
    /// `notification_logs/{logId}`, append-only.
    notification_logs: NotificationLogId => NotificationLog
}

def_table! {
    /// In-memory-semantics draw lock: a transactional marker touched by the
    /// Lottery Engine to detect an overlapping draw on the same event
    /// (§5 "Concurrent lottery draws on the same event are not supported").
    events_draw_lock: EventId => crate::DrawLockRecord
}
