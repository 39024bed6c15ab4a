//! Builder pattern for constructing LoginGuard instances
//!
//! This module provides a type-safe builder for creating [`LoginGuard`] instances with
//! compile-time validation of storage configuration.
//!
//! # Example
//!
//! ```rust,no_run
//! use login_guard::{AttemptGuardConfig, LoginGuardBuilder};
//! use chrono::Duration;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let guard = LoginGuardBuilder::new()
//!     .with_memory_storage()
//!     .with_config(AttemptGuardConfig {
//!         max_attempts: 5,
//!         block_duration: Duration::minutes(15),
//!         ..Default::default()
//!     })
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use login_guard_core::{
    AttemptGuardConfig, AttemptRepository,
    clock::{Clock, SystemClock},
};

use crate::LoginGuard;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur when building a LoginGuard instance.
#[derive(Debug, thiserror::Error)]
pub enum LoginGuardBuilderError {
    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

// ============================================================================
// Type-State Markers
// ============================================================================

/// Marker type indicating no storage has been configured yet.
///
/// This is the initial state of [`LoginGuardBuilder`].
pub struct NoStorage;

/// Marker type indicating storage has been configured.
///
/// Contains the repository that will hold attempt records.
pub struct WithStorage<R: AttemptRepository> {
    repository: Arc<R>,
}

// ============================================================================
// Builder Implementation
// ============================================================================

/// A type-safe builder for constructing [`LoginGuard`] instances.
///
/// # Type States
///
/// - [`NoStorage`]: Initial state, storage must be configured
/// - [`WithStorage<R>`]: Storage configured, ready to build
pub struct LoginGuardBuilder<Storage> {
    storage: Storage,
    config: AttemptGuardConfig,
    clock: Arc<dyn Clock>,
}

impl Default for LoginGuardBuilder<NoStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginGuardBuilder<NoStorage> {
    /// Create a new builder with default configuration.
    ///
    /// # Defaults
    ///
    /// - Protection: Enabled (3 attempts, 30 min block)
    /// - Cleanup interval: 5 minutes
    /// - Clock: system time
    pub fn new() -> Self {
        Self {
            storage: NoStorage,
            config: AttemptGuardConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Keep attempt records in process memory.
    #[cfg(feature = "memory")]
    pub fn with_memory_storage(
        self,
    ) -> LoginGuardBuilder<WithStorage<crate::MemoryAttemptRepository>> {
        self.with_repository(Arc::new(crate::MemoryAttemptRepository::new()))
    }

    /// Use an existing repository, for example one backed by a shared store.
    pub fn with_repository<R: AttemptRepository>(
        self,
        repository: Arc<R>,
    ) -> LoginGuardBuilder<WithStorage<R>> {
        LoginGuardBuilder {
            storage: WithStorage { repository },
            config: self.config,
            clock: self.clock,
        }
    }
}

impl<S> LoginGuardBuilder<S> {
    /// Set the attempt threshold, block duration and sweep interval.
    ///
    /// The configuration is validated by [`LoginGuardBuilder::build`].
    pub fn with_config(mut self, config: AttemptGuardConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the time source used to evaluate blocks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl<R: AttemptRepository> LoginGuardBuilder<WithStorage<R>> {
    /// Build the LoginGuard instance.
    ///
    /// # Returns
    ///
    /// The configured guard, or an error if the configuration is out of range.
    pub fn build(self) -> Result<LoginGuard<R>, LoginGuardBuilderError> {
        tracing::debug!(
            enabled = self.config.enabled,
            max_attempts = self.config.max_attempts,
            block_duration_secs = self.config.block_duration.num_seconds(),
            "Building login guard"
        );

        LoginGuard::from_parts(self.storage.repository, self.config, self.clock)
    }
}
