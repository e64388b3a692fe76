//! The Lottery Engine (§4.4): random selection, the draw procedures,
//! acceptance/decline/organizer-cancellation, and the optional deadline
//! sweeper. Owns every transition between the four per-event rosters.

use backon::Retryable as _;
use lottery_core::profile::ParticipationStatus;
use lottery_core::roster::{CancellationReason, Captured, ResponsePendingStatus};
use lottery_core::{EventId, HistoryEntry, Timestamp, UserId};
use lottery_store::{Batch, BatchOp};
use rand::SeedableRng as _;
use rand::seq::IndexedRandom as _;
use tracing::{debug, info, warn};

use crate::error::{ConflictSnafu, PreconditionFailedSnafu};
use crate::registry::Location;
use crate::{Engine, EngineError, EngineResult, LOG_TARGET};

/// Result of a draw (§4.4 "Initial draw" / "Replacement draw"): the
/// selected winners, the candidates who were not selected, and the
/// response deadline assigned to every winner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawOutcome {
    pub winners: Vec<UserId>,
    pub losers: Vec<UserId>,
    pub deadline: Timestamp,
}

#[derive(Debug, Clone, Copy)]
enum EligibilitySource {
    Waiting,
    CancelledDeclined,
}

struct Candidate {
    user_id: UserId,
    location: Option<Captured>,
    source: EligibilitySource,
}

/// Uniformly-random-without-replacement selection of `k` winners from
/// `candidates` (§4.4 "Random-selection contract"). `seed = None` uses a
/// cryptographically-seeded source; `Some(seed)` is reproducible, for
/// tests only.
pub fn select_uniform(candidates: &[UserId], k: usize, seed: Option<u64>) -> Vec<UserId> {
    let k = k.min(candidates.len());
    match seed {
        Some(seed) => {
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
            candidates.choose_multiple(&mut rng, k).copied().collect()
        }
        None => {
            let mut rng = rand::rng();
            candidates.choose_multiple(&mut rng, k).copied().collect()
        }
    }
}

impl Engine {
    async fn eligibility_for_replacement(&self, event_id: EventId) -> EngineResult<Vec<Candidate>> {
        let waiting = self.store.load_waiting(event_id).await?;
        let cancelled = self.store.load_cancelled(event_id).await?;

        let mut candidates: Vec<Candidate> = waiting
            .iter_by_entered_at()
            .map(|r| Candidate {
                user_id: r.user_id,
                location: r.location,
                source: EligibilitySource::Waiting,
            })
            .collect();

        candidates.extend(cancelled.iter_by_entered_at().filter(|r| r.reason == CancellationReason::Declined).map(
            |r| Candidate {
                user_id: r.user_id,
                location: r.location,
                source: EligibilitySource::CancelledDeclined,
            },
        ));

        Ok(candidates)
    }

    /// §4.4 "The engine exposes a `candidatesAvailableForReplacement(eventId)`
    /// query for organizer tooling."
    pub async fn candidates_available_for_replacement(&self, event_id: EventId) -> EngineResult<Vec<UserId>> {
        Ok(self
            .eligibility_for_replacement(event_id)
            .await?
            .into_iter()
            .map(|c| c.user_id)
            .collect())
    }

    /// *Initial draw* (§4.4). Requires event status `OPEN` or `CLOSED`;
    /// refuses `CANCELLED`/`COMPLETED`. Every waiting entrant at draw time
    /// is processed: winners move to `responsePending`, losers are removed
    /// from `waiting` with a `NOT_SELECTED` history entry.
    pub async fn initial_draw(
        &self,
        event_id: EventId,
        number_of_winners: usize,
        now: Timestamp,
        seed: Option<u64>,
    ) -> EngineResult<DrawOutcome> {
        let event = self.get_event(event_id).await?;
        if matches!(event.status, lottery_core::EventStatus::Cancelled | lottery_core::EventStatus::Completed) {
            return PreconditionFailedSnafu {
                what: format!("event {event_id} is {:?}, cannot draw", event.status),
            }
            .fail();
        }
        if number_of_winners == 0 {
            return Ok(DrawOutcome { winners: Vec::new(), losers: Vec::new(), deadline: now + self.config.response_window });
        }

        self.acquire_draw_lock(event_id, now).await?;
        let result = self.run_draw(event_id, number_of_winners, now, seed, ParticipationStatus::Selected, true).await;
        self.store.release_draw_lock(event_id).await?;
        result
    }

    /// *Replacement draw* (§4.4). Eligibility = `waiting ∪
    /// cancelled-from-decline`, excluding anyone in `responsePending`,
    /// `inEvent`, or `cancelled-by-organizer`. Event status is left
    /// unchanged; the history tag is `REPLACEMENT_SELECTED`. Candidates not
    /// selected remain in their current roster unchanged (see `DESIGN.md`
    /// for why the initial draw's "everyone processed" rule is not
    /// reapplied here).
    pub async fn replacement_draw(
        &self,
        event_id: EventId,
        number_of_replacements: usize,
        now: Timestamp,
        seed: Option<u64>,
    ) -> EngineResult<DrawOutcome> {
        self.get_event(event_id).await?;
        if number_of_replacements == 0 {
            return Ok(DrawOutcome { winners: Vec::new(), losers: Vec::new(), deadline: now + self.config.response_window });
        }

        self.acquire_draw_lock(event_id, now).await?;
        let result = self
            .run_draw(event_id, number_of_replacements, now, seed, ParticipationStatus::ReplacementSelected, false)
            .await;
        self.store.release_draw_lock(event_id).await?;
        result
    }

    async fn acquire_draw_lock(&self, event_id: EventId, now: Timestamp) -> EngineResult<()> {
        self.store.try_acquire_draw_lock(event_id, now).await.map_err(|source| {
            if source.is_retryable() {
                EngineError::from(source)
            } else {
                ConflictSnafu {
                    what: format!("a draw is already in progress for event {event_id}"),
                }
                .build()
            }
        })
    }

    async fn run_draw(
        &self,
        event_id: EventId,
        target_count: usize,
        now: Timestamp,
        seed: Option<u64>,
        winner_tag: ParticipationStatus,
        close_event: bool,
    ) -> EngineResult<DrawOutcome> {
        let candidates = if close_event {
            self.store
                .load_waiting(event_id)
                .await?
                .iter_by_entered_at()
                .map(|r| Candidate {
                    user_id: r.user_id,
                    location: r.location,
                    source: EligibilitySource::Waiting,
                })
                .collect::<Vec<_>>()
        } else {
            self.eligibility_for_replacement(event_id).await?
        };

        let candidate_ids: Vec<UserId> = candidates.iter().map(|c| c.user_id).collect();
        let winner_ids = select_uniform(&candidate_ids, target_count, seed);
        let deadline = now + self.config.response_window;

        let winners: Vec<&Candidate> = candidates.iter().filter(|c| winner_ids.contains(&c.user_id)).collect();
        // Losers only exist for the initial draw, which processes the
        // entire waiting list (§4.4 step 4/6).
        let losers: Vec<&Candidate> =
            if close_event { candidates.iter().filter(|c| !winner_ids.contains(&c.user_id)).collect() } else { Vec::new() };

        let profile_ids: Vec<UserId> = winners.iter().chain(losers.iter()).map(|c| c.user_id).collect();
        let mut profiles = self.store.get_profiles(&profile_ids).await?;

        let event = self.get_event(event_id).await?;

        let mut batch = Batch::new();
        {
            for candidate in &winners {
                match candidate.source {
                    EligibilitySource::Waiting => {
                        batch.push(BatchOp::DeleteWaiting(event_id, candidate.user_id));
                    }
                    EligibilitySource::CancelledDeclined => {
                        batch.push(BatchOp::DeleteCancelled(event_id, candidate.user_id));
                    }
                }
                batch.push(BatchOp::PutResponsePending(
                    event_id,
                    lottery_core::roster::ResponsePendingRecord {
                        user_id: candidate.user_id,
                        selected_at: now,
                        deadline,
                        location: candidate.location,
                        status: ResponsePendingStatus::Awaiting,
                    },
                ));
                if let Some(profile) = profiles.get_mut(&candidate.user_id) {
                    profile.push_history(HistoryEntry {
                        event_id,
                        event_name: event.name.clone(),
                        join_timestamp: now,
                        participation_status: winner_tag,
                    });
                    batch.push(BatchOp::PutProfile(profile.clone()));
                }
            }

            for candidate in &losers {
                batch.push(BatchOp::DeleteWaiting(event_id, candidate.user_id));
                if let Some(profile) = profiles.get_mut(&candidate.user_id) {
                    profile.push_history(HistoryEntry {
                        event_id,
                        event_name: event.name.clone(),
                        join_timestamp: now,
                        participation_status: ParticipationStatus::NotSelected,
                    });
                    batch.push(BatchOp::PutProfile(profile.clone()));
                }
            }

            if close_event {
                let mut closed_event = event.clone();
                closed_event.status = lottery_core::EventStatus::Closed;
                closed_event.has_drawn = true;
                batch.push(BatchOp::PutEvent(closed_event));
            }
        }

        (|| async { self.store.commit_batch(batch.clone()).await })
            .retry(backon::FibonacciBuilder::default().with_jitter().with_max_times(3))
            .when(lottery_store::StoreError::is_retryable)
            .notify(|e, _| warn!(target: LOG_TARGET, err = %e, "Retrying draw batch commit"))
            .await?;

        info!(
            target: LOG_TARGET,
            %event_id,
            winners = winners.len(),
            losers = losers.len(),
            "Draw committed"
        );

        Ok(DrawOutcome {
            winners: winners.iter().map(|c| c.user_id).collect(),
            losers: losers.iter().map(|c| c.user_id).collect(),
            deadline,
        })
    }

    /// *Acceptance* (§4.4). Requires a live `responsePending` record whose
    /// deadline has not passed and `|inEvent| < capacity`.
    pub async fn accept(&self, event_id: EventId, user_id: UserId, now: Timestamp, location: Option<Location>) -> EngineResult<()> {
        let event = self.get_event(event_id).await?;

        let in_event = self.store.load_in_event(event_id).await?;
        if in_event.contains(user_id) {
            debug!(target: LOG_TARGET, %event_id, %user_id, "Accept: already enrolled, no-op");
            return Ok(());
        }

        let pending = self.store.load_response_pending(event_id).await?;
        let record = pending.get(user_id).ok_or_else(|| {
            PreconditionFailedSnafu {
                what: format!("user {user_id} has no responsePending record for event {event_id}"),
            }
            .build()
        })?;
        if record.deadline_passed(now) {
            return PreconditionFailedSnafu {
                what: format!("user {user_id}'s response deadline for event {event_id} has passed"),
            }
            .fail();
        }

        if in_event.count() >= event.capacity.get() {
            return PreconditionFailedSnafu {
                what: format!("event {event_id} is at capacity"),
            }
            .fail();
        }

        let mut batch = Batch::new();
        batch.push(BatchOp::DeleteResponsePending(event_id, user_id));
        batch.push(BatchOp::PutInEvent(
            event_id,
            lottery_core::roster::InEventRecord {
                user_id,
                enrolled_at: now,
                location: location
                    .map(|l| Captured { point: l.point, captured_at: l.captured_at })
                    .or(record.location),
                checked_in: false,
            },
        ));

        if let Some(mut profile) = self.store.get_profile(user_id).await? {
            profile.push_history(HistoryEntry {
                event_id,
                event_name: event.name.clone(),
                join_timestamp: now,
                participation_status: ParticipationStatus::Enrolled,
            });
            batch.push(BatchOp::PutProfile(profile));
        }

        let will_be_full = in_event.count() + 1 >= event.capacity.get();
        let last_occurrence_passed = event.occurrences.iter().max().is_some_and(|last| *last <= now);
        if will_be_full && last_occurrence_passed {
            let mut completed_event = event.clone();
            completed_event.status = lottery_core::EventStatus::Completed;
            batch.push(BatchOp::PutEvent(completed_event));
        }

        self.store.commit_batch(batch).await?;
        info!(target: LOG_TARGET, %event_id, %user_id, "Acceptance committed");
        Ok(())
    }

    /// *Decline* (§4.4). No automatic replacement draw is triggered.
    pub async fn decline(&self, event_id: EventId, user_id: UserId, now: Timestamp) -> EngineResult<()> {
        let cancelled = self.store.load_cancelled(event_id).await?;
        if cancelled.get(user_id).is_some_and(|r| r.reason == CancellationReason::Declined) {
            debug!(target: LOG_TARGET, %event_id, %user_id, "Decline: already declined, no-op");
            return Ok(());
        }

        let pending = self.store.load_response_pending(event_id).await?;
        let record = pending.get(user_id).ok_or_else(|| {
            PreconditionFailedSnafu {
                what: format!("user {user_id} has no responsePending record for event {event_id}"),
            }
            .build()
        })?;

        let mut batch = Batch::new();
        batch.push(BatchOp::DeleteResponsePending(event_id, user_id));
        batch.push(BatchOp::PutCancelled(
            event_id,
            lottery_core::roster::CancelledRecord {
                user_id,
                cancelled_at: now,
                location: record.location,
                reason: CancellationReason::Declined,
            },
        ));
        self.push_cancelled_history(&mut batch, event_id, user_id, now).await?;

        self.store.commit_batch(batch).await?;
        info!(target: LOG_TARGET, %event_id, %user_id, "Decline committed");
        Ok(())
    }

    /// *Organizer cancellation of a confirmed entrant* (§4.4).
    pub async fn organizer_cancel(&self, event_id: EventId, user_id: UserId, now: Timestamp) -> EngineResult<()> {
        let in_event = self.store.load_in_event(event_id).await?;
        let record = in_event.get(user_id).ok_or_else(|| {
            PreconditionFailedSnafu {
                what: format!("user {user_id} is not enrolled in event {event_id}"),
            }
            .build()
        })?;

        let mut batch = Batch::new();
        batch.push(BatchOp::DeleteInEvent(event_id, user_id));
        batch.push(BatchOp::PutCancelled(
            event_id,
            lottery_core::roster::CancelledRecord {
                user_id,
                cancelled_at: now,
                location: record.location,
                reason: CancellationReason::CancelledByOrganizer,
            },
        ));
        self.push_cancelled_history(&mut batch, event_id, user_id, now).await?;

        self.store.commit_batch(batch).await?;
        info!(target: LOG_TARGET, %event_id, %user_id, "Organizer cancellation committed");
        Ok(())
    }

    async fn push_cancelled_history(&self, batch: &mut Batch, event_id: EventId, user_id: UserId, now: Timestamp) -> EngineResult<()> {
        if let Some(mut profile) = self.store.get_profile(user_id).await? {
            let event_name = self.store.get_event(event_id).await?.map(|e| e.name).unwrap_or_default();
            profile.push_history(HistoryEntry {
                event_id,
                event_name,
                join_timestamp: now,
                participation_status: ParticipationStatus::Cancelled,
            });
            batch.push(BatchOp::PutProfile(profile));
        }
        Ok(())
    }

    /// *Deadline sweeper* (§4.4, optional). Moves every expired
    /// `responsePending` record to `cancelled(EXPIRED)`, across every event.
    pub async fn run_deadline_sweep(&self, now: Timestamp) -> EngineResult<usize> {
        let expired = self.store.find_all_expired_response_pending(now).await?;
        let mut swept = 0;

        for (event_id, record) in expired {
            let mut batch = Batch::new();
            batch.push(BatchOp::DeleteResponsePending(event_id, record.user_id));
            batch.push(BatchOp::PutCancelled(
                event_id,
                lottery_core::roster::CancelledRecord {
                    user_id: record.user_id,
                    cancelled_at: now,
                    location: record.location,
                    reason: CancellationReason::Expired,
                },
            ));
            self.store.commit_batch(batch).await?;
            swept += 1;
        }

        if swept > 0 {
            info!(target: LOG_TARGET, swept, "Deadline sweep complete");
        }
        Ok(swept)
    }
}

#[cfg(test)]
mod tests;
