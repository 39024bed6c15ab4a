//! # Login Guard
//!
//! Login Guard protects an authentication endpoint against brute force
//! password guessing. It counts consecutive failed attempts per identity (a
//! username together with the network origin it was tried from) and refuses
//! further attempts for a while once too many have failed.
//!
//! The guard never verifies credentials itself. The authentication handler
//! owns that and calls the guard around it:
//!
//! 1. [`LoginGuard::check_if_blocked`] before verifying credentials. If the
//!    identity is blocked, reject the request and show the returned message.
//! 2. [`LoginGuard::record_failed_attempt`] when verification fails, and show
//!    the returned message.
//! 3. [`LoginGuard::record_successful_attempt`] when verification succeeds,
//!    before issuing a session.
//!
//! ## Storage Support
//!
//! - In-memory (default, feature `memory`)
//! - Any type implementing [`AttemptRepository`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use login_guard::{IdentityKey, LoginGuardBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let guard = LoginGuardBuilder::new().with_memory_storage().build()?;
//!     let identity = IdentityKey::new("alice", Some("1.2.3.4"));
//!
//!     let status = guard.check_if_blocked(&identity).await?;
//!     if status.is_blocked {
//!         println!("{}", status.message);
//!         return Ok(());
//!     }
//!
//!     // credentials were wrong
//!     let status = guard.record_failed_attempt(&identity).await?;
//!     println!("{}", status.message);
//!     Ok(())
//! }
//! ```
use std::sync::Arc;

use login_guard_core::{AttemptGuardService, clock::Clock};
use tokio::{sync::watch, task::JoinHandle};

pub mod builder;

pub use builder::{LoginGuardBuilder, LoginGuardBuilderError, NoStorage, WithStorage};

/// Re-export core types from login_guard_core
pub use login_guard_core::{
    AttemptGuardConfig, AttemptOutcome, AttemptRecord, AttemptRepository, AttemptStats,
    IdentityKey, ManualClock, SystemClock,
};

/// Re-export storage backends
#[cfg(feature = "memory")]
pub use login_guard_storage_memory::MemoryAttemptRepository;

#[derive(Debug, thiserror::Error)]
pub enum LoginGuardError {
    /// Error when interacting with storage
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<login_guard_core::Error> for LoginGuardError {
    fn from(error: login_guard_core::Error) -> Self {
        LoginGuardError::StorageError(error.to_string())
    }
}

/// Handle to a configured login guard.
///
/// Cloning is cheap; every clone shares the same attempt state.
pub struct LoginGuard<R: AttemptRepository> {
    service: Arc<AttemptGuardService<R>>,
}

impl<R: AttemptRepository> Clone for LoginGuard<R> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

impl<R: AttemptRepository> LoginGuard<R> {
    /// Create a new guard with the default configuration
    ///
    /// # Arguments
    ///
    /// * `repository` - Where attempt records are stored
    pub fn new(repository: Arc<R>) -> Result<Self, LoginGuardBuilderError> {
        Self::from_parts(
            repository,
            AttemptGuardConfig::default(),
            Arc::new(SystemClock),
        )
    }

    pub(crate) fn from_parts(
        repository: Arc<R>,
        config: AttemptGuardConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LoginGuardBuilderError> {
        let service = AttemptGuardService::with_clock(repository, config, clock)
            .map_err(|e| LoginGuardBuilderError::InvalidConfiguration(e.to_string()))?;
        Ok(Self {
            service: Arc::new(service),
        })
    }

    /// The active configuration
    pub fn config(&self) -> &AttemptGuardConfig {
        self.service.config()
    }

    /// Access the underlying service
    pub fn service(&self) -> &Arc<AttemptGuardService<R>> {
        &self.service
    }

    /// Record a failed authentication attempt for an identity
    ///
    /// # Returns
    ///
    /// The block state after the attempt. Relay `message` to the caller.
    pub async fn record_failed_attempt(
        &self,
        identity: &IdentityKey,
    ) -> Result<AttemptOutcome, LoginGuardError> {
        Ok(self.service.record_failed_attempt(identity).await?)
    }

    /// Reset tracking after a successful authentication
    pub async fn record_successful_attempt(
        &self,
        identity: &IdentityKey,
    ) -> Result<(), LoginGuardError> {
        Ok(self.service.record_successful_attempt(identity).await?)
    }

    /// Check whether an identity is currently blocked, without recording anything
    pub async fn check_if_blocked(
        &self,
        identity: &IdentityKey,
    ) -> Result<AttemptOutcome, LoginGuardError> {
        Ok(self.service.check_if_blocked(identity).await?)
    }

    /// Remove all tracking for an identity (administrative unblock)
    ///
    /// # Returns
    ///
    /// `true` if the identity had a record
    pub async fn clear_attempts(&self, identity: &IdentityKey) -> Result<bool, LoginGuardError> {
        Ok(self.service.clear_attempts(identity).await?)
    }

    /// Remove records whose block has run out
    ///
    /// # Returns
    ///
    /// The number of records removed
    pub async fn cleanup_expired_blocks(&self) -> Result<u64, LoginGuardError> {
        Ok(self.service.cleanup_expired_blocks().await?)
    }

    /// Aggregate counts across all tracked identities
    pub async fn get_attempt_stats(&self) -> Result<AttemptStats, LoginGuardError> {
        Ok(self.service.get_attempt_stats().await?)
    }

    /// Start the periodic maintenance sweep
    ///
    /// The task runs until `shutdown` changes or its sender is dropped.
    pub fn start_cleanup_task(&self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        self.service.start_cleanup_task(shutdown)
    }
}
