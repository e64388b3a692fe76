//! The Cascade Manager (§4.5): profile deletion across every roster, and
//! organizer deletion (event reaping followed by profile deletion), both
//! as cooperatively-cancellable multi-batch sequences (§5 "Cancellation").

use lottery_core::UserId;
use lottery_store::{Batch, BatchOp};
use tracing::info;

use crate::{Engine, EngineResult, LOG_TARGET};

/// Checked between batches (§5): "Every long-running operation ... MUST
/// honor cooperative cancellation checked between batches." Blanket-
/// implemented for any `Fn() -> bool`, so a plain closure works as a
/// signal without a dedicated wrapper type.
pub trait CancelSignal: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

impl<F: Fn() -> bool + Send + Sync> CancelSignal for F {
    fn is_cancelled(&self) -> bool {
        self()
    }
}

pub struct NeverCancel;

impl CancelSignal for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A cascade's partial-or-complete result (§4.5 "Partial failure ... leaves
/// the system in a consistent-but-incomplete state ... the cascade can be
/// retried safely").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CascadeOutcome {
    pub completed: bool,
    pub batches_committed: usize,
    pub events_reaped: usize,
    pub profile_deleted: bool,
}

impl Engine {
    /// *Profile deletion* (§4.5). Removes `user_id` from every roster
    /// across every event, then deletes the profile document; the profile
    /// delete is the commit point a caller may rely on (§4.5 "a caller
    /// observing the profile absent may assume cascade completion").
    pub async fn delete_profile(&self, user_id: UserId, cancel: &dyn CancelSignal) -> EngineResult<CascadeOutcome> {
        let mut ops = Vec::new();
        ops.extend(self.store.find_waiting_for_user(user_id).await?.into_iter().map(|(event_id, _)| BatchOp::DeleteWaiting(event_id, user_id)));
        ops.extend(
            self.store
                .find_response_pending_for_user(user_id)
                .await?
                .into_iter()
                .map(|(event_id, _)| BatchOp::DeleteResponsePending(event_id, user_id)),
        );
        ops.extend(self.store.find_in_event_for_user(user_id).await?.into_iter().map(|(event_id, _)| BatchOp::DeleteInEvent(event_id, user_id)));
        ops.extend(self.store.find_cancelled_for_user(user_id).await?.into_iter().map(|(event_id, _)| BatchOp::DeleteCancelled(event_id, user_id)));

        let mut outcome = CascadeOutcome::default();
        for chunk in ops.chunks(self.config.max_batch_ops) {
            if cancel.is_cancelled() {
                info!(target: LOG_TARGET, %user_id, batches = outcome.batches_committed, "Profile deletion cascade cancelled");
                return Ok(outcome);
            }
            let mut batch = Batch::new();
            for op in chunk {
                batch.push(op.clone());
            }
            self.store.commit_batch(batch).await?;
            outcome.batches_committed += 1;
        }

        if cancel.is_cancelled() {
            return Ok(outcome);
        }

        self.store.delete_profile_doc(user_id).await?;
        outcome.profile_deleted = true;
        outcome.completed = true;
        info!(target: LOG_TARGET, %user_id, batches = outcome.batches_committed, "Profile deletion cascade complete");
        Ok(outcome)
    }

    /// *Organizer deletion* (§4.5). Reaps every event owned by
    /// `organizer_id` (rosters before the event document), then runs
    /// profile deletion on the organizer.
    pub async fn delete_organizer(&self, organizer_id: UserId, cancel: &dyn CancelSignal) -> EngineResult<CascadeOutcome> {
        let events = self.store.list_events_by_organizer(organizer_id).await?;
        let mut outcome = CascadeOutcome::default();

        for event in &events {
            if cancel.is_cancelled() {
                return Ok(outcome);
            }

            let mut ops = Vec::new();
            ops.extend(self.store.load_waiting(event.id).await?.user_ids().map(|u| BatchOp::DeleteWaiting(event.id, u)));
            ops.extend(self.store.load_response_pending(event.id).await?.user_ids().map(|u| BatchOp::DeleteResponsePending(event.id, u)));
            ops.extend(self.store.load_in_event(event.id).await?.user_ids().map(|u| BatchOp::DeleteInEvent(event.id, u)));
            ops.extend(self.store.load_cancelled(event.id).await?.user_ids().map(|u| BatchOp::DeleteCancelled(event.id, u)));

            for chunk in ops.chunks(self.config.max_batch_ops) {
                if cancel.is_cancelled() {
                    return Ok(outcome);
                }
                let mut batch = Batch::new();
                for op in chunk {
                    batch.push(op.clone());
                }
                self.store.commit_batch(batch).await?;
                outcome.batches_committed += 1;
            }

            self.store.delete_event(event.id).await?;
            outcome.events_reaped += 1;
        }

        if cancel.is_cancelled() {
            return Ok(outcome);
        }

        let profile_outcome = self.delete_profile(organizer_id, cancel).await?;
        outcome.batches_committed += profile_outcome.batches_committed;
        outcome.profile_deleted = profile_outcome.profile_deleted;
        outcome.completed = profile_outcome.completed;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests;
