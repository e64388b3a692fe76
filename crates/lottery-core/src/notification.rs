//! The notification log (§3 "NotificationLog") and its type tag.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::ids::{EventId, NotificationLogId, UserId};
use crate::timestamp::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    LotteryWin,
    LotteryLoss,
    ReplacementDraw,
    OrganizerMessage,
    Cancellation,
}

impl NotificationType {
    /// Mandatory delivery regardless of the recipient's notification
    /// preference (§4.6 "Recipient filtering", step 2).
    pub fn is_mandatory(self) -> bool {
        matches!(self, NotificationType::Cancellation)
    }

    /// The payload carries a response-deadline timestamp only for these two
    /// types (§4.6 "Payload contract").
    pub fn carries_deadline(self) -> bool {
        matches!(
            self,
            NotificationType::LotteryWin | NotificationType::ReplacementDraw
        )
    }
}

/// Sender of a notification: an organizer's [`UserId`], or the literal
/// `SYSTEM` sender used by engine-triggered broadcasts (§3 "NotificationLog").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum Sender {
    System,
    User(UserId),
}

/// An immutable audit record (§3 "NotificationLog"): created, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct NotificationLog {
    pub id: NotificationLogId,
    pub sent_at: Timestamp,
    pub sender: Sender,
    pub event_id: EventId,
    pub recipients: Vec<UserId>,
    pub message: String,
    pub notification_type: NotificationType,
}
