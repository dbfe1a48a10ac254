//! Bounded in-process session store.
//!
//! API clients that send a key but keep no cookies get a fresh session on every
//! request. Records therefore expire at their own `expiry_date`, and the store never
//! holds more than `capacity` of them; the least recently used go first.

use async_trait::async_trait;
use moka::{future::Cache, policy::EvictionPolicy, Expiry};
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use tower_sessions::{
    session::{Id, Record},
    session_store, SessionStore,
};

#[derive(Clone, Debug)]
pub struct SessionCache {
    records: Cache<Id, Record>,
}

impl SessionCache {
    pub fn new(capacity: u64) -> Self {
        let records = Cache::builder()
            .max_capacity(capacity)
            .eviction_policy(EvictionPolicy::lru())
            .expire_after(RecordExpiry)
            .build();

        Self { records }
    }

    /// Number of stored records. Exact only after [`run_pending_tasks`](Self::run_pending_tasks).
    pub fn len(&self) -> u64 {
        self.records.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply pending evictions and expirations now instead of on later writes.
    pub async fn run_pending_tasks(&self) {
        self.records.run_pending_tasks().await;
    }
}

#[async_trait]
impl SessionStore for SessionCache {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        while self.records.contains_key(&record.id) {
            record.id = Id::default();
        }
        self.records.insert(record.id, record.clone()).await;
        Ok(())
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.records.insert(record.id, record.clone()).await;
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        Ok(self
            .records
            .get(session_id)
            .await
            .filter(|record| record.expiry_date > OffsetDateTime::now_utc()))
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.records.invalidate(session_id).await;
        Ok(())
    }
}

/// Each record lives until its own `expiry_date`, which the session layer pushes
/// forward on every save.
struct RecordExpiry;

impl RecordExpiry {
    fn time_left(record: &Record) -> Duration {
        Duration::try_from(record.expiry_date - OffsetDateTime::now_utc()).unwrap_or(Duration::ZERO)
    }
}

impl Expiry<Id, Record> for RecordExpiry {
    fn expire_after_create(&self, _id: &Id, record: &Record, _created_at: Instant) -> Option<Duration> {
        Some(Self::time_left(record))
    }

    fn expire_after_update(
        &self,
        _id: &Id,
        record: &Record,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(Self::time_left(record))
    }
}
