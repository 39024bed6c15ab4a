//! Stored state, call outcomes and configuration for attempt tracking.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Longest block a configuration may ask for.
pub const MAX_BLOCK_DURATION_DAYS: i64 = 365;

/// Tracking state for one identity key.
///
/// A record exists only after the first failure for its key and is removed
/// on success or an explicit clear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// The account the attempts were made against
    pub username: String,
    /// Consecutive failures since the last success or clear
    pub attempts: u32,
    /// When the most recent failure was recorded
    pub last_attempt_at: DateTime<Utc>,
    /// Set once `attempts` reaches the configured threshold
    pub blocked_until: Option<DateTime<Utc>>,
}

impl AttemptRecord {
    /// A fresh record with no failures counted yet.
    pub fn new(username: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            username: username.into(),
            attempts: 0,
            last_attempt_at: now,
            blocked_until: None,
        }
    }

    /// Whether the block is still in force at `now`.
    pub fn is_blocked_at(&self, now: DateTime<Utc>) -> bool {
        self.blocked_until.is_some_and(|until| until > now)
    }

    /// Whether a block was set and has since run out.
    pub fn block_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.blocked_until.is_some_and(|until| until <= now)
    }

    /// Time left on an active block, `None` if not blocked at `now`.
    pub fn block_time_remaining_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.blocked_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }
}

/// The result of checking or recording an attempt.
///
/// `message` is meant to be relayed to the end user as-is (or translated by
/// the caller).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptOutcome {
    pub is_blocked: bool,
    pub remaining_attempts: u32,
    /// Only set while blocked
    pub block_time_remaining: Option<Duration>,
    pub message: String,
}

impl AttemptOutcome {
    pub(crate) fn unblocked(remaining_attempts: u32, message: impl Into<String>) -> Self {
        Self {
            is_blocked: false,
            remaining_attempts,
            block_time_remaining: None,
            message: message.into(),
        }
    }

    pub(crate) fn blocked(block_time_remaining: Duration, message: impl Into<String>) -> Self {
        Self {
            is_blocked: true,
            remaining_attempts: 0,
            block_time_remaining: Some(block_time_remaining),
            message: message.into(),
        }
    }

    /// Seconds until the block lifts, rounded up, suitable for a `Retry-After` header.
    ///
    /// Returns `None` when not blocked.
    pub fn retry_after_seconds(&self) -> Option<u64> {
        self.block_time_remaining_ms().map(|ms| ms.div_ceil(1000))
    }

    /// Milliseconds until the block lifts, `None` when not blocked.
    pub fn block_time_remaining_ms(&self) -> Option<u64> {
        self.block_time_remaining
            .map(|remaining| remaining.num_milliseconds().max(0) as u64)
    }
}

/// Aggregate view over every stored record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptStats {
    /// Records whose block is currently in force
    pub total_blocked: u64,
    /// Sum of `attempts` across all records
    pub total_attempts: u64,
}

/// Configuration for login attempt protection.
///
/// # Example
///
/// ```rust
/// use login_guard_core::storage::AttemptGuardConfig;
/// use chrono::Duration;
///
/// let config = AttemptGuardConfig {
///     max_attempts: 5,
///     block_duration: Duration::minutes(15),
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptGuardConfig {
    /// When false, nothing is recorded and every identity is reported unblocked
    pub enabled: bool,
    /// Failures allowed before blocking
    pub max_attempts: u32,
    /// How long a block lasts once triggered
    pub block_duration: Duration,
    /// Period of the background maintenance sweep
    pub cleanup_interval: Duration,
}

impl Default for AttemptGuardConfig {
    /// Enabled, 3 attempts, 30 minute block, sweep every 5 minutes.
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            block_duration: Duration::minutes(30),
            cleanup_interval: Duration::minutes(5),
        }
    }
}

impl AttemptGuardConfig {
    /// A configuration that turns protection off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Check that every option is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroMaxAttempts);
        }
        if self.block_duration <= Duration::zero() {
            return Err(ConfigError::NonPositiveBlockDuration);
        }
        if self.block_duration > Duration::days(MAX_BLOCK_DURATION_DAYS) {
            return Err(ConfigError::BlockDurationTooLarge {
                max_days: MAX_BLOCK_DURATION_DAYS,
            });
        }
        if self.cleanup_interval <= Duration::zero() {
            return Err(ConfigError::NonPositiveCleanupInterval);
        }
        Ok(())
    }
}
