//! Repository trait for login attempt records.
//!
//! This module defines the key-value interface the guard uses to read and
//! write [`AttemptRecord`]s. All blocking policy lives in
//! [`AttemptGuardService`](crate::services::AttemptGuardService); a repository
//! only stores what it is given.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{Error, identity::IdentityKey, storage::AttemptRecord};

/// Storage for attempt records keyed by identity.
///
/// The in-memory backend is the default. Deployments that need block state
/// shared between several processes can implement this trait over an external
/// store.
///
/// # Consistency
///
/// Implementations only need per-key last-writer-wins semantics. The service
/// serialises read-modify-write sequences for a key before calling into the
/// repository, so `get` followed by `put` for one key is never interleaved with
/// another writer from the same process.
#[async_trait]
pub trait AttemptRepository: Send + Sync + 'static {
    /// Fetch the record for `key`, if any.
    async fn get(&self, key: &IdentityKey) -> Result<Option<AttemptRecord>, Error>;

    /// Insert or replace the record for `key`.
    async fn put(&self, key: &IdentityKey, record: AttemptRecord) -> Result<(), Error>;

    /// Remove the record for `key`.
    ///
    /// # Returns
    ///
    /// `true` if a record was present.
    async fn delete(&self, key: &IdentityKey) -> Result<bool, Error>;

    /// Snapshot every stored record.
    ///
    /// The snapshot does not need to be atomic across keys.
    async fn scan(&self) -> Result<Vec<(IdentityKey, AttemptRecord)>, Error>;
}

#[async_trait]
impl<R: AttemptRepository + ?Sized> AttemptRepository for Arc<R> {
    async fn get(&self, key: &IdentityKey) -> Result<Option<AttemptRecord>, Error> {
        (**self).get(key).await
    }

    async fn put(&self, key: &IdentityKey, record: AttemptRecord) -> Result<(), Error> {
        (**self).put(key, record).await
    }

    async fn delete(&self, key: &IdentityKey) -> Result<bool, Error> {
        (**self).delete(key).await
    }

    async fn scan(&self) -> Result<Vec<(IdentityKey, AttemptRecord)>, Error> {
        (**self).scan().await
    }
}
