//! Batched writes that commit atomically, bounded in size (§4.1).
//!
//! A [`Batch`] is the in-memory transfer object callers build before a
//! single `write_with` commit — the crate's rendition of "batched writes
//! that commit atomically (all-or-nothing, bounded in size)".

use lottery_core::event::Event;
use lottery_core::notification::NotificationLog;
use lottery_core::profile::Profile;
use lottery_core::roster::{CancelledRecord, InEventRecord, ResponsePendingRecord, WaitingRecord};
use lottery_core::{EventId, UserId};

use crate::error::{StoreError, StoreResult};
use crate::store::WriteTx;
use crate::tables;

/// Bounded at 500 operations, matching the external-interface note in §6
/// ("atomic multi-document batch writes (bounded at ≥500 operations)").
pub const MAX_BATCH_OPS: usize = 500;

#[derive(Debug, Clone)]
pub enum BatchOp {
    PutEvent(Event),
    DeleteEvent(EventId),
    PutProfile(Profile),
    DeleteProfile(UserId),
    PutWaiting(EventId, WaitingRecord),
    DeleteWaiting(EventId, UserId),
    PutResponsePending(EventId, ResponsePendingRecord),
    DeleteResponsePending(EventId, UserId),
    PutInEvent(EventId, InEventRecord),
    DeleteInEvent(EventId, UserId),
    PutCancelled(EventId, CancelledRecord),
    DeleteCancelled(EventId, UserId),
    PutNotificationLog(NotificationLog),
}

#[derive(Debug, Clone, Default)]
pub struct Batch {
    ops: Vec<BatchOp>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: BatchOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub(crate) fn apply(&self, tx: &WriteTx) -> StoreResult<()> {
        if self.ops.len() > MAX_BATCH_OPS {
            return Err(StoreError::internal_message(format!(
                "batch of {} operations exceeds the {MAX_BATCH_OPS} bound",
                self.ops.len(),
            )));
        }

        let mut events = tx.open_table(&tables::events::TABLE)?;
        let mut profiles = tx.open_table(&tables::profiles::TABLE)?;
        let mut waiting = tx.open_table(&tables::waiting::TABLE)?;
        let mut response_pending = tx.open_table(&tables::response_pending::TABLE)?;
        let mut in_event = tx.open_table(&tables::in_event::TABLE)?;
        let mut cancelled = tx.open_table(&tables::cancelled::TABLE)?;
        let mut notification_logs = tx.open_table(&tables::notification_logs::TABLE)?;

        for op in &self.ops {
            match op {
                BatchOp::PutEvent(event) => {
                    events.insert(&event.id, event)?;
                }
                BatchOp::DeleteEvent(id) => {
                    events.remove(id)?;
                }
                BatchOp::PutProfile(profile) => {
                    profiles.insert(&profile.id, profile)?;
                }
                BatchOp::DeleteProfile(id) => {
                    profiles.remove(id)?;
                }
                BatchOp::PutWaiting(event_id, record) => {
                    waiting.insert(&(*event_id, record.user_id), record)?;
                }
                BatchOp::DeleteWaiting(event_id, user_id) => {
                    waiting.remove(&(*event_id, *user_id))?;
                }
                BatchOp::PutResponsePending(event_id, record) => {
                    response_pending.insert(&(*event_id, record.user_id), record)?;
                }
                BatchOp::DeleteResponsePending(event_id, user_id) => {
                    response_pending.remove(&(*event_id, *user_id))?;
                }
                BatchOp::PutInEvent(event_id, record) => {
                    in_event.insert(&(*event_id, record.user_id), record)?;
                }
                BatchOp::DeleteInEvent(event_id, user_id) => {
                    in_event.remove(&(*event_id, *user_id))?;
                }
                BatchOp::PutCancelled(event_id, record) => {
                    cancelled.insert(&(*event_id, record.user_id), record)?;
                }
                BatchOp::DeleteCancelled(event_id, user_id) => {
                    cancelled.remove(&(*event_id, *user_id))?;
                }
                BatchOp::PutNotificationLog(log) => {
                    notification_logs.insert(&log.id, log)?;
                }
            }
        }

        Ok(())
    }
}
