//! The Roster Model (§4.2): pure, in-memory operations over a loaded roster
//! set. Stateless with respect to the store — it is the transfer object
//! [`lottery-store`] hydrates from, and the batch-construction scratchpad
//! `lottery-engine` builds before handing a batch to the store.

use std::collections::HashMap;
use std::time::Duration;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::event::GeoPoint;
use crate::ids::UserId;
use crate::timestamp::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum CancellationReason {
    Declined,
    Expired,
    CancelledByOrganizer,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct Captured {
    pub point: GeoPoint,
    pub captured_at: Timestamp,
}

/// Common shape every per-roster membership record shares (§3 "Roster
/// Membership"): the user ID (duplicated here for collection-group
/// queries, per spec), the timestamp it entered this roster, and an
/// optional captured geolocation.
pub trait RosterRecord {
    fn user_id(&self) -> UserId;
    fn entered_at(&self) -> Timestamp;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct WaitingRecord {
    pub user_id: UserId,
    pub joined_at: Timestamp,
    pub location: Option<Captured>,
}

impl RosterRecord for WaitingRecord {
    fn user_id(&self) -> UserId {
        self.user_id
    }

    fn entered_at(&self) -> Timestamp {
        self.joined_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub enum ResponsePendingStatus {
    Awaiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct ResponsePendingRecord {
    pub user_id: UserId,
    pub selected_at: Timestamp,
    pub deadline: Timestamp,
    pub location: Option<Captured>,
    pub status: ResponsePendingStatus,
}

impl RosterRecord for ResponsePendingRecord {
    fn user_id(&self) -> UserId {
        self.user_id
    }

    fn entered_at(&self) -> Timestamp {
        self.selected_at
    }
}

impl ResponsePendingRecord {
    pub fn deadline_passed(&self, now: Timestamp) -> bool {
        self.deadline < now
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct InEventRecord {
    pub user_id: UserId,
    pub enrolled_at: Timestamp,
    pub location: Option<Captured>,
    pub checked_in: bool,
}

impl RosterRecord for InEventRecord {
    fn user_id(&self) -> UserId {
        self.user_id
    }

    fn entered_at(&self) -> Timestamp {
        self.enrolled_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct CancelledRecord {
    pub user_id: UserId,
    pub cancelled_at: Timestamp,
    pub location: Option<Captured>,
    pub reason: CancellationReason,
}

impl RosterRecord for CancelledRecord {
    fn user_id(&self) -> UserId {
        self.user_id
    }

    fn entered_at(&self) -> Timestamp {
        self.cancelled_at
    }
}

/// The response window (§4.4, GLOSSARY): 7 days from selection to the
/// acceptance deadline. A named constant of the engine rather than
/// event-configurable, per the Open Question in §9 — see `DESIGN.md`.
pub const RESPONSE_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone, PartialEq)]
pub struct RosterSet<R> {
    members: HashMap<UserId, R>,
}

impl<R> Default for RosterSet<R> {
    fn default() -> Self {
        Self {
            members: HashMap::new(),
        }
    }
}

impl<R: RosterRecord + Clone> RosterSet<R> {
    pub fn from_records(records: impl IntoIterator<Item = R>) -> Self {
        let mut set = Self::default();
        for record in records {
            set.members.insert(record.user_id(), record);
        }
        set
    }

    /// Returns `true` if `record` was newly added, `false` if `user_id`
    /// already held a membership (duplicate, rejected).
    pub fn add(&mut self, record: R) -> bool {
        if self.members.contains_key(&record.user_id()) {
            return false;
        }
        self.members.insert(record.user_id(), record);
        true
    }

    /// Idempotent: returns the removed record, if any (§4.2).
    pub fn remove(&mut self, user_id: UserId) -> Option<R> {
        self.members.remove(&user_id)
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.members.contains_key(&user_id)
    }

    pub fn get(&self, user_id: UserId) -> Option<&R> {
        self.members.get(&user_id)
    }

    pub fn count(&self) -> u32 {
        self.members.len() as u32
    }

    pub fn available_slots(&self, capacity: u32) -> u32 {
        capacity.saturating_sub(self.count())
    }

    pub fn user_ids(&self) -> impl Iterator<Item = UserId> + '_ {
        self.members.keys().copied()
    }

    /// Enumeration keyed by the timestamp the member entered this roster
    /// (join/selection/enrollment timestamp, per §4.2).
    pub fn iter_by_entered_at(&self) -> impl Iterator<Item = &R> {
        let mut records: Vec<&R> = self.members.values().collect();
        records.sort_by_key(|r| r.entered_at());
        records.into_iter()
    }
}

impl RosterSet<ResponsePendingRecord> {
    pub fn expired_as_of(&self, now: Timestamp) -> impl Iterator<Item = &ResponsePendingRecord> {
        self.members.values().filter(move |r| r.deadline_passed(now))
    }
}

impl RosterSet<InEventRecord> {
    /// Idempotent: returns `true` if this call flipped the flag from
    /// not-checked-in to checked-in (§4.2 "`InEvent` adds `checkIn(userId)`").
    pub fn check_in(&mut self, user_id: UserId) -> bool {
        match self.members.get_mut(&user_id) {
            Some(record) if !record.checked_in => {
                record.checked_in = true;
                true
            }
            _ => false,
        }
    }

    pub fn checked_in_count(&self) -> u32 {
        self.members.values().filter(|r| r.checked_in).count() as u32
    }
}
