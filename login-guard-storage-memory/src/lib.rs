//! In-memory implementation of the attempt repository.
//!
//! Records live in a sharded concurrent map for the lifetime of the process.
//! Nothing survives a restart and nothing is shared between processes; use an
//! external backend when either is needed.

use async_trait::async_trait;
use dashmap::DashMap;
use login_guard_core::{
    Error, identity::IdentityKey, repositories::AttemptRepository, storage::AttemptRecord,
};

/// In-memory repository for attempt records.
#[derive(Debug, Default)]
pub struct MemoryAttemptRepository {
    records: DashMap<IdentityKey, AttemptRecord>,
}

impl MemoryAttemptRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl AttemptRepository for MemoryAttemptRepository {
    async fn get(&self, key: &IdentityKey) -> Result<Option<AttemptRecord>, Error> {
        Ok(self.records.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: &IdentityKey, record: AttemptRecord) -> Result<(), Error> {
        self.records.insert(key.clone(), record);
        Ok(())
    }

    async fn delete(&self, key: &IdentityKey) -> Result<bool, Error> {
        Ok(self.records.remove(key).is_some())
    }

    async fn scan(&self) -> Result<Vec<(IdentityKey, AttemptRecord)>, Error> {
        let records: Vec<_> = self
            .records
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        tracing::trace!(count = records.len(), "Scanned attempt records");
        Ok(records)
    }
}
