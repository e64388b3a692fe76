//! The Event Registry (§4.3): event CRUD, organizer/entrant queries, and
//! the waiting-list admission protocol.

use lottery_core::event::{Event, EventStatus};
use lottery_core::roster::{CancelledRecord, InEventRecord, ResponsePendingRecord, RosterSet, WaitingRecord};
use lottery_core::{EventId, Timestamp, UserId};
use tracing::{debug, info};

use crate::error::{ConflictSnafu, NotFoundSnafu, PreconditionFailedSnafu};
use crate::{Engine, EngineResult, LOG_TARGET};

/// Optional geolocation captured on join/selection/enrollment (§3 "Roster
/// Membership").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub point: lottery_core::event::GeoPoint,
    pub captured_at: Timestamp,
}

impl Engine {
    /// *Create event* (§4.3): assigns an ID if none supplied, validates the
    /// construction-time invariants, and persists with status `OPEN` when
    /// `publish` is set (otherwise `DRAFT`).
    pub async fn create_event(&self, mut event: Event, publish: bool) -> EngineResult<Event> {
        event.validate()?;
        event.status = if publish { EventStatus::Open } else { EventStatus::Draft };
        info!(target: LOG_TARGET, event_id = %event.id, "Creating event");
        self.store.put_event(event.clone()).await?;
        Ok(event)
    }

    /// *Update event* (§4.3): field-level update via a mutator closure.
    /// Forbidden: changing `organizer_id`, changing `capacity` once
    /// `has_drawn` is set.
    pub async fn update_event(
        &self,
        event_id: EventId,
        mutate: impl FnOnce(&mut Event),
    ) -> EngineResult<Event> {
        let mut event = self.get_event(event_id).await?;
        let original_organizer = event.organizer_id;
        let original_capacity = event.capacity;
        let has_drawn = event.has_drawn;

        mutate(&mut event);
        event.validate()?;

        if event.organizer_id != original_organizer {
            return ConflictSnafu {
                what: "organizer_id cannot change after creation",
            }
            .fail();
        }
        if has_drawn && event.capacity != original_capacity {
            return PreconditionFailedSnafu {
                what: "capacity cannot change once a lottery draw has occurred",
            }
            .fail();
        }

        self.store.put_event(event.clone()).await?;
        Ok(event)
    }

    /// *Delete event* (§4.3): removes only the event document. Subcollection
    /// reaping is the Cascade Manager's job (§4.5).
    pub async fn delete_event(&self, event_id: EventId) -> EngineResult<()> {
        self.store.delete_event(event_id).await?;
        Ok(())
    }

    pub async fn get_event(&self, event_id: EventId) -> EngineResult<Event> {
        self.store.get_event(event_id).await?.ok_or_else(|| {
            NotFoundSnafu {
                what: format!("event {event_id}"),
            }
            .build()
        })
    }

    pub async fn list_events_by_organizer(&self, organizer_id: UserId) -> EngineResult<Vec<Event>> {
        Ok(self.store.list_events_by_organizer(organizer_id).await?)
    }

    pub async fn list_all_events(&self) -> EngineResult<Vec<Event>> {
        Ok(self.store.list_all_events().await?)
    }

    /// *List-for-entrant* (§4.3): every `OPEN` event whose registration
    /// window contains `now`. The store query filters on status only; the
    /// window predicate is evaluated here so no composite index is needed.
    pub async fn list_for_entrant(&self, now: Timestamp) -> EngineResult<Vec<Event>> {
        let all = self.store.list_all_events().await?;
        Ok(all
            .into_iter()
            .filter(|e| e.status == EventStatus::Open && e.registration_start <= now && now <= e.registration_end)
            .collect())
    }

    /// *Join waiting list* (§4.3 "Waiting-list admission"). Returns `true`
    /// if the user was newly admitted, `false` if this was a no-op repeat
    /// of an existing membership.
    pub async fn join_waiting_list(
        &self,
        event_id: EventId,
        user_id: UserId,
        now: Timestamp,
        location: Option<Location>,
    ) -> EngineResult<bool> {
        let event = self.get_event(event_id).await?;

        if event.status != EventStatus::Open {
            return PreconditionFailedSnafu {
                what: format!("event {event_id} is not OPEN"),
            }
            .fail();
        }
        if !(event.registration_start <= now && now <= event.registration_end) {
            return PreconditionFailedSnafu {
                what: format!("event {event_id}'s registration window is closed"),
            }
            .fail();
        }
        if event.capacity.get() == 0 {
            return PreconditionFailedSnafu {
                what: format!("event {event_id} has zero capacity"),
            }
            .fail();
        }

        let waiting = self.store.load_waiting(event_id).await?;
        if waiting.contains(user_id) {
            debug!(target: LOG_TARGET, %event_id, %user_id, "Join waiting list: already a member, no-op");
            return Ok(false);
        }

        let record = WaitingRecord {
            user_id,
            joined_at: now,
            location: location.map(|l| lottery_core::roster::Captured {
                point: l.point,
                captured_at: l.captured_at,
            }),
        };

        let cap = match event.waiting_list_cap {
            lottery_core::event::WaitingListCap::Unlimited => None,
            lottery_core::event::WaitingListCap::Capped(cap) => Some(cap.get()),
        };

        let admitted = if self.config.require_transactional_admission || cap.is_none() {
            self.store.admit_waiting_transactional(event_id, record, cap).await?
        } else {
            // Faithfully reproduces the source's soft-cap race (§9): the
            // size-check and the write are two separate store calls.
            let current_size = waiting.count();
            if current_size >= cap.unwrap_or(u32::MAX) {
                false
            } else {
                self.store.put_waiting_record(event_id, record).await?;
                true
            }
        };

        if !admitted {
            return PreconditionFailedSnafu {
                what: format!("event {event_id}'s waiting list is at capacity"),
            }
            .fail();
        }

        Ok(true)
    }

    /// *Leave waiting list* (§4.3): idempotent delete.
    pub async fn leave_waiting_list(&self, event_id: EventId, user_id: UserId) -> EngineResult<()> {
        self.store.delete_waiting(event_id, user_id).await?;
        Ok(())
    }

    pub async fn read_waiting(&self, event_id: EventId) -> EngineResult<RosterSet<WaitingRecord>> {
        Ok(self.store.load_waiting(event_id).await?)
    }

    pub async fn read_response_pending(&self, event_id: EventId) -> EngineResult<RosterSet<ResponsePendingRecord>> {
        Ok(self.store.load_response_pending(event_id).await?)
    }

    pub async fn read_in_event(&self, event_id: EventId) -> EngineResult<RosterSet<InEventRecord>> {
        Ok(self.store.load_in_event(event_id).await?)
    }

    pub async fn read_cancelled(&self, event_id: EventId) -> EngineResult<RosterSet<CancelledRecord>> {
        Ok(self.store.load_cancelled(event_id).await?)
    }

    /// *Collection-group lookups for a user* (§4.3): populates a personal
    /// dashboard without a per-event scan.
    pub async fn dashboard_for_user(&self, user_id: UserId) -> EngineResult<UserDashboard> {
        Ok(UserDashboard {
            waiting: self.store.find_waiting_for_user(user_id).await?,
            response_pending: self.store.find_response_pending_for_user(user_id).await?,
            in_event: self.store.find_in_event_for_user(user_id).await?,
            cancelled: self.store.find_cancelled_for_user(user_id).await?,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserDashboard {
    pub waiting: Vec<(EventId, WaitingRecord)>,
    pub response_pending: Vec<(EventId, ResponsePendingRecord)>,
    pub in_event: Vec<(EventId, InEventRecord)>,
    pub cancelled: Vec<(EventId, CancelledRecord)>,
}

#[cfg(test)]
mod tests;
