//! The profile document (§3 "Profile").

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use snafu::Snafu;

use crate::ids::{EventId, UserId};
use crate::timestamp::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum Role {
    Entrant,
    Organizer,
    Admin,
}

/// The tag appended to a profile's history (§3 "Profile", §4.4's per-
/// transition tags: `NOT_SELECTED`, `SELECTED`, `REPLACEMENT_SELECTED`,
/// `ENROLLED`, `CANCELLED`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum ParticipationStatus {
    Selected,
    NotSelected,
    ReplacementSelected,
    Enrolled,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct HistoryEntry {
    pub event_id: EventId,
    pub event_name: String,
    pub join_timestamp: Timestamp,
    pub participation_status: ParticipationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct Profile {
    pub id: UserId,
    pub display_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub profile_image_ref: Option<String>,
    pub notification_enabled: bool,
    pub role: Role,
    pub push_token: Option<String>,
    pub history: Vec<HistoryEntry>,
}

impl Profile {
    pub fn new(id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            email: None,
            phone: None,
            profile_image_ref: None,
            notification_enabled: true,
            role: Role::Entrant,
            push_token: None,
            history: Vec::new(),
        }
    }

    /// Append-only history (§3 "Profile"): never mutates existing entries.
    pub fn push_history(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
    }
}

/// `requireRole` helper centralizing the role checks the source scatters
/// through presentation code (§9 "Role checks scattered through
/// presentation").
#[derive(Debug, Snafu)]
pub enum RoleError {
    #[snafu(display("user {user} does not hold required role {required:?}"))]
    Forbidden {
        user: UserId,
        required: Role,
    },
}

pub fn require_role(profile: &Profile, required: Role) -> Result<(), RoleError> {
    if profile.role == required || profile.role == Role::Admin {
        return Ok(());
    }
    ForbiddenSnafu {
        user: profile.id,
        required,
    }
    .fail()
}
