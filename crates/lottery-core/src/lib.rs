//! Pure data model for the lottery/roster state engine (§3, §4.2).
//!
//! This crate has no store or I/O dependency: [`lottery-store`] hydrates
//! these types from disk, [`lottery-engine`] is the only crate that builds
//! and commits transitions between them.

pub mod event;
pub mod ids;
pub mod notification;
pub mod profile;
pub mod qr;
pub mod roster;
pub mod timestamp;

pub use event::{Event, EventStatus, EventValidationError, GeoPoint, WaitingListCap};
pub use ids::{EventId, NotificationLogId, UserId};
pub use notification::{NotificationLog, NotificationType, Sender};
pub use profile::{require_role, HistoryEntry, ParticipationStatus, Profile, Role, RoleError};
pub use qr::{decode_qr_payload, encode_qr_payload, encode_qr_payload_with_hash};
pub use roster::{
    CancellationReason, CancelledRecord, Captured, InEventRecord, ResponsePendingRecord,
    ResponsePendingStatus, RosterRecord, RosterSet, WaitingRecord, RESPONSE_WINDOW,
};
pub use timestamp::Timestamp;
