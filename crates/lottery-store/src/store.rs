//! The Store Abstraction (§4.1): a typed view over documents, subcollections,
//! batches, and collection-group queries, backed by `redb`/`redb-bincode`
//! (the teacher's storage stack — see `rostra-client-db::Database`).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use lottery_core::event::Event;
use lottery_core::notification::NotificationLog;
use lottery_core::profile::Profile;
use lottery_core::roster::{CancelledRecord, InEventRecord, ResponsePendingRecord, RosterSet, WaitingRecord};
use lottery_core::{EventId, UserId};
use itertools::Itertools as _;
use tracing::debug;

use crate::batch::Batch;
use crate::error::{StoreError, StoreResult};
use crate::tables;

pub(crate) type WriteTx = redb_bincode::WriteTransaction;
pub(crate) type ReadTx = redb_bincode::ReadTransaction;

const LOG_TARGET: &str = "lottery::store";

#[derive(Debug, Clone, Copy, PartialEq, Eq, bincode::Encode, bincode::Decode, serde::Serialize, serde::Deserialize)]
pub struct DrawLockRecord {
    pub started_at: lottery_core::Timestamp,
}

/// A typed view over documents, subcollections, batches, and collection-
/// group queries (§4.1).
#[derive(Debug, Clone)]
pub struct Store {
    inner: Arc<redb_bincode::Database>,
}

impl Store {
    pub async fn new_in_memory() -> StoreResult<Self> {
        debug!(target: LOG_TARGET, "Opening in-memory store");
        let inner = redb::Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .map_err(StoreError::from)?;
        Self::open_inner(redb_bincode::Database::from(inner)).await
    }

    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path: PathBuf = path.into();
        debug!(target: LOG_TARGET, path = %path.display(), "Opening store");
        let inner = tokio::task::spawn_blocking(move || redb::Database::create(path))
            .await
            .map_err(StoreError::from)?
            .map_err(StoreError::from)?;
        Self::open_inner(redb_bincode::Database::from(inner)).await
    }

    async fn open_inner(inner: redb_bincode::Database) -> StoreResult<Self> {
        let store = Self { inner: Arc::new(inner) };
        store
            .write_with(|tx| {
                tx.open_table(&tables::events::TABLE)?;
                tx.open_table(&tables::profiles::TABLE)?;
                tx.open_table(&tables::waiting::TABLE)?;
                tx.open_table(&tables::response_pending::TABLE)?;
                tx.open_table(&tables::in_event::TABLE)?;
                tx.open_table(&tables::cancelled::TABLE)?;
                tx.open_table(&tables::notification_logs::TABLE)?;
                tx.open_table(&tables::events_draw_lock::TABLE)?;
                Ok(())
            })
            .await?;
        Ok(store)
    }

    /// A transactional read-modify-write over a small document set
    /// (§4.1), exposed for the waiting-list admission's required
    /// re-read-then-write protocol (§4.3) and for any other caller that
    /// needs more than one table touched atomically.
    pub async fn write_with<T: Send + 'static>(
        &self,
        f: impl FnOnce(&WriteTx) -> StoreResult<T> + Send + 'static,
    ) -> StoreResult<T> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let tx = inner.begin_write().map_err(StoreError::from)?;
            let res = f(&tx)?;
            tx.commit().map_err(StoreError::from)?;
            Ok(res)
        })
        .await
        .map_err(StoreError::from)?
    }

    pub async fn read_with<T: Send + 'static>(
        &self,
        f: impl FnOnce(&ReadTx) -> StoreResult<T> + Send + 'static,
    ) -> StoreResult<T> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let tx = inner.begin_read().map_err(StoreError::from)?;
            f(&tx)
        })
        .await
        .map_err(StoreError::from)?
    }

    /// Same guarantee as [`Store::write_with`] — an alias kept for call
    /// sites that want to read "this is a transaction" at a glance (§4.1's
    /// required transactional waiting-list admission, §4.3).
    pub async fn transact<T: Send + 'static>(
        &self,
        f: impl FnOnce(&WriteTx) -> StoreResult<T> + Send + 'static,
    ) -> StoreResult<T> {
        self.write_with(f).await
    }

    pub async fn commit_batch(&self, batch: Batch) -> StoreResult<()> {
        self.write_with(move |tx| batch.apply(tx)).await
    }

    // -- Events ----------------------------------------------------------

    pub async fn get_event(&self, id: EventId) -> StoreResult<Option<Event>> {
        self.read_with(move |tx| {
            let table = tx.open_table(&tables::events::TABLE)?;
            Ok(table.get(&id)?.map(|g| g.value()))
        })
        .await
    }

    pub async fn put_event(&self, event: Event) -> StoreResult<()> {
        self.write_with(move |tx| {
            let mut table = tx.open_table(&tables::events::TABLE)?;
            table.insert(&event.id, &event)?;
            Ok(())
        })
        .await
    }

    pub async fn delete_event(&self, id: EventId) -> StoreResult<()> {
        self.write_with(move |tx| {
            let mut table = tx.open_table(&tables::events::TABLE)?;
            table.remove(&id)?;
            Ok(())
        })
        .await
    }

    pub async fn list_all_events(&self) -> StoreResult<Vec<Event>> {
        self.read_with(|tx| {
            let table = tx.open_table(&tables::events::TABLE)?;
            let mut out = Vec::new();
            for row in table.range(..)? {
                let (_, v) = row?;
                out.push(v.value());
            }
            Ok(out)
        })
        .await
    }

    pub async fn list_events_by_organizer(&self, organizer_id: UserId) -> StoreResult<Vec<Event>> {
        let all = self.list_all_events().await?;
        Ok(all.into_iter().filter(|e| e.organizer_id == organizer_id).collect())
    }

    // -- Profiles ----------------------------------------------------------

    pub async fn get_profile(&self, id: UserId) -> StoreResult<Option<Profile>> {
        self.read_with(move |tx| {
            let table = tx.open_table(&tables::profiles::TABLE)?;
            Ok(table.get(&id)?.map(|g| g.value()))
        })
        .await
    }

    pub async fn put_profile(&self, profile: Profile) -> StoreResult<()> {
        self.write_with(move |tx| {
            let mut table = tx.open_table(&tables::profiles::TABLE)?;
            table.insert(&profile.id, &profile)?;
            Ok(())
        })
        .await
    }

    pub async fn delete_profile_doc(&self, id: UserId) -> StoreResult<()> {
        self.write_with(move |tx| {
            let mut table = tx.open_table(&tables::profiles::TABLE)?;
            table.remove(&id)?;
            Ok(())
        })
        .await
    }

    pub async fn get_profiles(&self, ids: &[UserId]) -> StoreResult<HashMap<UserId, Profile>> {
        let ids = ids.to_vec();
        self.read_with(move |tx| {
            let table = tx.open_table(&tables::profiles::TABLE)?;
            let mut out = HashMap::new();
            for id in ids {
                if let Some(guard) = table.get(&id)? {
                    out.insert(id, guard.value());
                }
            }
            Ok(out)
        })
        .await
    }

    /// The transactional half of waiting-list admission (§4.3): re-reads
    /// the current waiting-list size and writes the new record in the same
    /// transaction, closing the race window between a size-check and a
    /// write. Returns `false` (no-op) if `cap` is already met.
    pub async fn admit_waiting_transactional(
        &self,
        event_id: EventId,
        record: WaitingRecord,
        cap: Option<u32>,
    ) -> StoreResult<bool> {
        self.write_with(move |tx| {
            let mut table = tx.open_table(&tables::waiting::TABLE)?;
            if let Some(cap) = cap {
                let start = (event_id, UserId::from_uuid(uuid::Uuid::nil()));
                let end = (event_id, UserId::from_uuid(uuid::Uuid::max()));
                let current_size = table.range(start..=end)?.count() as u32;
                if current_size >= cap {
                    return Ok(false);
                }
            }
            table.insert(&(event_id, record.user_id), &record)?;
            Ok(true)
        })
        .await
    }

    /// Unconditional write, bypassing the cap re-check — used only to
    /// faithfully reproduce the source's non-transactional (soft-cap)
    /// admission path when [`crate::Config`]-equivalent policy requests it
    /// (§9 "an implementer faithfully preserving source behavior would
    /// make this configurable").
    pub async fn put_waiting_record(&self, event_id: EventId, record: WaitingRecord) -> StoreResult<()> {
        self.write_with(move |tx| {
            let mut table = tx.open_table(&tables::waiting::TABLE)?;
            table.insert(&(event_id, record.user_id), &record)?;
            Ok(())
        })
        .await
    }

    pub async fn delete_waiting(&self, event_id: EventId, user_id: UserId) -> StoreResult<()> {
        self.write_with(move |tx| {
            let mut table = tx.open_table(&tables::waiting::TABLE)?;
            table.remove(&(event_id, user_id))?;
            Ok(())
        })
        .await
    }

    pub async fn put_notification_log(&self, log: NotificationLog) -> StoreResult<()> {
        self.write_with(move |tx| {
            let mut table = tx.open_table(&tables::notification_logs::TABLE)?;
            table.insert(&log.id, &log)?;
            Ok(())
        })
        .await
    }

    // -- Rosters -------------------------------------------------------

    pub async fn load_waiting(&self, event_id: EventId) -> StoreResult<RosterSet<WaitingRecord>> {
        self.read_with(move |tx| {
            let table = tx.open_table(&tables::waiting::TABLE)?;
            Self::scan_event_range(&table, event_id)
        })
        .await
    }

    pub async fn load_response_pending(
        &self,
        event_id: EventId,
    ) -> StoreResult<RosterSet<ResponsePendingRecord>> {
        self.read_with(move |tx| {
            let table = tx.open_table(&tables::response_pending::TABLE)?;
            Self::scan_event_range(&table, event_id)
        })
        .await
    }

    pub async fn load_in_event(&self, event_id: EventId) -> StoreResult<RosterSet<InEventRecord>> {
        self.read_with(move |tx| {
            let table = tx.open_table(&tables::in_event::TABLE)?;
            Self::scan_event_range(&table, event_id)
        })
        .await
    }

    pub async fn load_cancelled(&self, event_id: EventId) -> StoreResult<RosterSet<CancelledRecord>> {
        self.read_with(move |tx| {
            let table = tx.open_table(&tables::cancelled::TABLE)?;
            Self::scan_event_range(&table, event_id)
        })
        .await
    }

    fn scan_event_range<R, T>(
        table: &T,
        event_id: EventId,
    ) -> StoreResult<RosterSet<R>>
    where
        R: lottery_core::roster::RosterRecord + Clone + bincode::Decode<()> + bincode::Encode,
        T: redb_bincode::ReadableTable<(EventId, UserId), R>,
    {
        let start = (event_id, UserId::from_uuid(uuid::Uuid::nil()));
        let end = (event_id, UserId::from_uuid(uuid::Uuid::max()));
        let records = table.range(start..=end)?.map_ok(|(_, v)| v.value()).collect::<Result<Vec<_>, _>>()?;
        Ok(RosterSet::from_records(records))
    }

    /// Collection-group lookup for a user (§4.3 "Collection-group lookups
    /// for a user"): every `(event, membership)` pair across all events
    /// where the user appears in the given roster table.
    pub async fn find_waiting_for_user(&self, user_id: UserId) -> StoreResult<Vec<(EventId, WaitingRecord)>> {
        self.collection_group_scan(&tables::waiting::TABLE, user_id).await
    }

    pub async fn find_response_pending_for_user(
        &self,
        user_id: UserId,
    ) -> StoreResult<Vec<(EventId, ResponsePendingRecord)>> {
        self.collection_group_scan(&tables::response_pending::TABLE, user_id).await
    }

    pub async fn find_in_event_for_user(&self, user_id: UserId) -> StoreResult<Vec<(EventId, InEventRecord)>> {
        self.collection_group_scan(&tables::in_event::TABLE, user_id).await
    }

    pub async fn find_cancelled_for_user(&self, user_id: UserId) -> StoreResult<Vec<(EventId, CancelledRecord)>> {
        self.collection_group_scan(&tables::cancelled::TABLE, user_id).await
    }

    async fn collection_group_scan<R>(
        &self,
        def: &'static redb_bincode::TableDefinition<'static, (EventId, UserId), R>,
        user_id: UserId,
    ) -> StoreResult<Vec<(EventId, R)>>
    where
        R: lottery_core::roster::RosterRecord + Clone + bincode::Decode<()> + bincode::Encode + Send + Sync + 'static,
    {
        self.read_with(move |tx| {
            let table = tx.open_table(def)?;
            table
                .range(..)?
                .map_ok(|(k, v)| (k.value(), v.value()))
                .filter_ok(|((_, row_user_id), _)| *row_user_id == user_id)
                .map_ok(|((event_id, _), v)| (event_id, v))
                .collect::<Result<Vec<_>, _>>()
                .map_err(Into::into)
        })
        .await
    }

    /// All expired `responsePending` records across every event, for the
    /// deadline sweeper (§4.4).
    pub async fn find_all_expired_response_pending(
        &self,
        now: lottery_core::Timestamp,
    ) -> StoreResult<Vec<(EventId, ResponsePendingRecord)>> {
        self.read_with(move |tx| {
            let table = tx.open_table(&tables::response_pending::TABLE)?;
            let mut out = Vec::new();
            for row in table.range(..)? {
                let (k, v) = row?;
                let record = v.value();
                if record.deadline_passed(now) {
                    out.push((k.value().0, record));
                }
            }
            Ok(out)
        })
        .await
    }

    pub async fn notification_logs(&self) -> StoreResult<Vec<NotificationLog>> {
        self.read_with(|tx| {
            let table = tx.open_table(&tables::notification_logs::TABLE)?;
            let mut out = Vec::new();
            for row in table.range(..)? {
                let (_, v) = row?;
                out.push(v.value());
            }
            Ok(out)
        })
        .await
    }

    // -- Draw lock ---------------------------------------------------------

    /// Acquires the per-event draw lock transactionally, failing with
    /// `Conflict` if a draw is already in flight (§5 "Concurrent lottery
    /// draws on the same event are not supported").
    pub async fn try_acquire_draw_lock(&self, event_id: EventId, now: lottery_core::Timestamp) -> StoreResult<()> {
        self.write_with(move |tx| {
            let mut table = tx.open_table(&tables::events_draw_lock::TABLE)?;
            if table.get(&event_id)?.is_some() {
                return Err(StoreError::Conflict {
                    what: format!("a draw is already in progress for event {event_id}"),
                    location: snafu::Location::new(file!(), line!(), column!()),
                });
            }
            table.insert(&event_id, &DrawLockRecord { started_at: now })?;
            Ok(())
        })
        .await
    }

    pub async fn release_draw_lock(&self, event_id: EventId) -> StoreResult<()> {
        self.write_with(move |tx| {
            let mut table = tx.open_table(&tables::events_draw_lock::TABLE)?;
            table.remove(&event_id)?;
            Ok(())
        })
        .await
    }
}
