//! The event document (§3 "Event").

use std::num::NonZeroU32;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use snafu::Snafu;

use crate::ids::{EventId, UserId};
use crate::timestamp::Timestamp;

/// `capacity >= 1` and `waitingListCap`, when capped, `>= 1` are enforced at
/// construction by [`WaitingListCap::capped`] and [`EventDraft::validate`]
/// rather than by a bare integer sentinel (§9 "String-typed status enums":
/// prefer a typed alternative to a magic value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum WaitingListCap {
    Unlimited,
    Capped(NonZeroU32),
}

impl WaitingListCap {
    pub fn capped(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(WaitingListCap::Capped)
    }

    pub fn is_reached(self, current_size: u32) -> bool {
        match self {
            WaitingListCap::Unlimited => false,
            WaitingListCap::Capped(cap) => current_size >= cap.get(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum EventStatus {
    Draft,
    Open,
    Closed,
    Completed,
    Cancelled,
}

impl EventStatus {
    /// Status transitions are one-directional except `Cancelled`, which is
    /// reachable from any non-terminal state (§3 "Event" invariants).
    pub fn can_transition_to(self, next: EventStatus) -> bool {
        use EventStatus::*;
        if next == Cancelled {
            return !matches!(self, Completed | Cancelled);
        }
        matches!(
            (self, next),
            (Draft, Open) | (Open, Closed) | (Closed, Completed)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub description: String,
    pub organizer_id: UserId,
    pub occurrences: Vec<Timestamp>,
    pub location: String,
    pub registration_start: Timestamp,
    pub registration_end: Timestamp,
    pub capacity: NonZeroU32,
    pub waiting_list_cap: WaitingListCap,
    pub geolocation_required: bool,
    pub poster_ref: Option<String>,
    pub qr_payload_id: Option<String>,
    pub event_type: String,
    pub status: EventStatus,
    /// Set once the first lottery draw (initial or replacement) has run for
    /// this event; `update_event` forbids changing `capacity` once this is
    /// `true` (§4.3 "Update event").
    pub has_drawn: bool,
}

#[derive(Debug, Snafu)]
pub enum EventValidationError {
    #[snafu(display("registrationStart must be <= registrationEnd"))]
    WindowInverted,
}

impl Event {
    /// Validates the construction-time invariants of §3 ("Event"):
    /// `registrationStart <= registrationEnd`. `capacity >= 1` and
    /// `waitingListCap >= 1` when capped are enforced by the types
    /// (`NonZeroU32`) and so cannot be expressed by an invalid `Event` value.
    pub fn validate(&self) -> Result<(), EventValidationError> {
        if self.registration_start > self.registration_end {
            return Err(EventValidationError::WindowInverted);
        }
        Ok(())
    }

    pub fn is_registration_open_at(&self, now: Timestamp) -> bool {
        self.status == EventStatus::Open
            && self.registration_start <= now
            && now <= self.registration_end
    }
}
