//! Brute force protection service for login attempts.
//!
//! Tracks consecutive authentication failures per [`IdentityKey`] and blocks
//! further attempts for a fixed period once the configured threshold is hit.
//!
//! # Lifecycle of a record
//!
//! - Created on the first failure for an unseen key
//! - Incremented on every failure while unblocked
//! - Blocked for `block_duration` when `attempts` reaches `max_attempts`
//! - Left untouched by failures that arrive during an active block
//! - Removed on success, on an explicit clear, or by the maintenance sweep once
//!   its block has run out
//!
//! Block expiry is lazy: nothing fires when a block ends, the next read simply
//! compares `blocked_until` with the clock. A failure recorded after a block
//! has run out starts a fresh count, so the outcome is the same whether or not
//! the sweep removed the stale record first.
//!
//! # Example
//!
//! ```rust,ignore
//! use login_guard_core::{IdentityKey, services::AttemptGuardService, storage::AttemptGuardConfig};
//!
//! let service = AttemptGuardService::new(repository, AttemptGuardConfig::default())?;
//! let identity = IdentityKey::new("alice", Some("1.2.3.4"));
//!
//! // Before verifying credentials
//! let status = service.check_if_blocked(&identity).await?;
//! if status.is_blocked {
//!     return Err(status.message);
//! }
//!
//! // After verification fails
//! let status = service.record_failed_attempt(&identity).await?;
//! ```

use std::hash::{BuildHasher, RandomState};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, MutexGuard, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::{
    Error,
    clock::{Clock, SystemClock},
    identity::IdentityKey,
    repositories::AttemptRepository,
    storage::{AttemptGuardConfig, AttemptOutcome, AttemptRecord, AttemptStats},
};

/// Number of lock stripes guarding per-key read-modify-write sequences.
const LOCK_STRIPES: usize = 64;

/// Used when the configured sweep interval cannot drive a timer.
const FALLBACK_CLEANUP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(300);

/// Service for tracking failed login attempts and blocking repeat offenders.
///
/// # Thread Safety
///
/// The service is shared across request handlers, typically behind an `Arc`.
/// Every sequence that reads a record and writes it back holds the lock stripe
/// for that key, so two concurrent failures for one identity can never both
/// observe the same count. Different identities only contend when they hash to
/// the same stripe.
pub struct AttemptGuardService<R: AttemptRepository> {
    repository: Arc<R>,
    config: AttemptGuardConfig,
    clock: Arc<dyn Clock>,
    stripes: Box<[Mutex<()>]>,
    hasher: RandomState,
}

impl<R: AttemptRepository> AttemptGuardService<R> {
    /// Create a new service reading time from the system clock.
    ///
    /// # Arguments
    ///
    /// * `repository` - Where attempt records are stored
    /// * `config` - Threshold and block duration
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if `config` is out of range.
    pub fn new(repository: Arc<R>, config: AttemptGuardConfig) -> Result<Self, Error> {
        Self::with_clock(repository, config, Arc::new(SystemClock))
    }

    /// Create a new service with an explicit time source.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if `config` is out of range.
    pub fn with_clock(
        repository: Arc<R>,
        config: AttemptGuardConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, Error> {
        config.validate()?;
        let stripes = (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect();

        Ok(Self {
            repository,
            config,
            clock,
            stripes,
            hasher: RandomState::new(),
        })
    }

    /// Get the current configuration.
    pub fn config(&self) -> &AttemptGuardConfig {
        &self.config
    }

    /// Check if protection is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Get the underlying repository.
    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Record a failed authentication attempt.
    ///
    /// A failure that arrives while the identity is blocked is not counted and
    /// does not extend the block.
    ///
    /// # Returns
    ///
    /// The block state after the attempt, with a message for the end user.
    pub async fn record_failed_attempt(
        &self,
        identity: &IdentityKey,
    ) -> Result<AttemptOutcome, Error> {
        if !self.config.enabled {
            return Ok(self.disabled_outcome());
        }

        let _guard = self.lock_key(identity).await;
        let now = self.clock.now();

        let mut record = self
            .repository
            .get(identity)
            .await?
            .unwrap_or_else(|| AttemptRecord::new(identity.username(), now));

        if let Some(remaining) = record.block_time_remaining_at(now) {
            tracing::debug!(
                identity = %identity,
                attempts = record.attempts,
                "Failed attempt during active block ignored"
            );
            return Ok(self.blocked_outcome(remaining));
        }

        if record.block_expired_at(now) {
            tracing::debug!(identity = %identity, "Block expired, starting a fresh count");
            record.attempts = 0;
            record.blocked_until = None;
        }

        record.attempts = record.attempts.saturating_add(1);
        record.last_attempt_at = now;
        let attempts = record.attempts;

        if attempts >= self.config.max_attempts {
            let blocked_until = now
                .checked_add_signed(self.config.block_duration)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            record.blocked_until = Some(blocked_until);
            self.repository.put(identity, record).await?;

            tracing::info!(
                identity = %identity,
                attempts = attempts,
                blocked_until = %blocked_until,
                "Identity blocked after too many failed login attempts"
            );

            return Ok(AttemptOutcome::blocked(
                self.config.block_duration,
                format!(
                    "Too many failed login attempts. Access has been blocked for {}.",
                    format_minutes(self.config.block_duration)
                ),
            ));
        }

        self.repository.put(identity, record).await?;

        let remaining = self.config.max_attempts - attempts;
        tracing::debug!(
            identity = %identity,
            attempts = attempts,
            remaining = remaining,
            "Recorded failed login attempt"
        );

        let message = if remaining == 1 {
            format!(
                "Login failed. This is your last attempt before access is blocked for {}.",
                format_minutes(self.config.block_duration)
            )
        } else {
            format!(
                "Login failed. {remaining} attempts remaining before access is temporarily blocked."
            )
        };

        Ok(AttemptOutcome::unblocked(remaining, message))
    }

    /// Reset tracking for an identity after it authenticated successfully.
    ///
    /// This should be called before issuing a session.
    pub async fn record_successful_attempt(&self, identity: &IdentityKey) -> Result<(), Error> {
        let _guard = self.lock_key(identity).await;
        if self.repository.delete(identity).await? {
            tracing::debug!(identity = %identity, "Cleared failed attempts after successful login");
        }
        Ok(())
    }

    /// Report the block state of an identity without changing anything.
    ///
    /// Handlers should call this before verifying credentials and reject the
    /// request with the returned message when `is_blocked` is set.
    pub async fn check_if_blocked(&self, identity: &IdentityKey) -> Result<AttemptOutcome, Error> {
        if !self.config.enabled {
            return Ok(self.disabled_outcome());
        }

        let now = self.clock.now();
        let Some(record) = self.repository.get(identity).await? else {
            return Ok(AttemptOutcome::unblocked(self.config.max_attempts, ""));
        };

        match record.block_time_remaining_at(now) {
            Some(remaining) => Ok(self.blocked_outcome(remaining)),
            None => Ok(AttemptOutcome::unblocked(
                self.config.max_attempts.saturating_sub(record.attempts),
                "",
            )),
        }
    }

    /// Remove all tracking for an identity, lifting any block.
    ///
    /// # Returns
    ///
    /// `true` if a record existed.
    pub async fn clear_attempts(&self, identity: &IdentityKey) -> Result<bool, Error> {
        let _guard = self.lock_key(identity).await;
        let removed = self.repository.delete(identity).await?;
        if removed {
            tracing::debug!(identity = %identity, "Cleared failed attempts");
        }
        Ok(removed)
    }

    /// Remove every record whose block has run out.
    ///
    /// Records that were never blocked are kept. Each candidate is re-read
    /// under its key's lock before deletion, so a record rewritten by a
    /// concurrent failure is left alone.
    ///
    /// # Returns
    ///
    /// The number of records removed.
    pub async fn cleanup_expired_blocks(&self) -> Result<u64, Error> {
        let now = self.clock.now();
        let candidates: Vec<IdentityKey> = self
            .repository
            .scan()
            .await?
            .into_iter()
            .filter(|(_, record)| record.block_expired_at(now))
            .map(|(key, _)| key)
            .collect();

        let mut removed = 0;
        for key in candidates {
            let _guard = self.lock_key(&key).await;
            let still_expired = self
                .repository
                .get(&key)
                .await?
                .is_some_and(|record| record.block_expired_at(now));

            if still_expired && self.repository.delete(&key).await? {
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!(count = removed, "Removed expired login blocks");
        }

        Ok(removed)
    }

    /// Aggregate counts over every stored record.
    pub async fn get_attempt_stats(&self) -> Result<AttemptStats, Error> {
        let now = self.clock.now();
        let stats = self
            .repository
            .scan()
            .await?
            .iter()
            .fold(AttemptStats::default(), |mut stats, (_, record)| {
                stats.total_attempts += u64::from(record.attempts);
                if record.is_blocked_at(now) {
                    stats.total_blocked += 1;
                }
                stats
            });

        Ok(stats)
    }

    /// Snapshot of the stored record for an identity, if any.
    pub async fn attempt_record(
        &self,
        identity: &IdentityKey,
    ) -> Result<Option<AttemptRecord>, Error> {
        self.repository.get(identity).await
    }

    /// Start the background maintenance sweep.
    ///
    /// Spawns a task that calls [`cleanup_expired_blocks`](Self::cleanup_expired_blocks)
    /// every `cleanup_interval` until `shutdown` changes or its sender is dropped.
    /// Store failures are logged and the task keeps running.
    pub fn start_cleanup_task(
        self: &Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let service = Arc::clone(self);
        let period = self
            .config
            .cleanup_interval
            .to_std()
            .ok()
            .filter(|period| !period.is_zero())
            .unwrap_or(FALLBACK_CLEANUP_INTERVAL);

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(period);
            interval_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        if let Err(e) = service.cleanup_expired_blocks().await {
                            tracing::warn!(
                                error = %e,
                                "Failed to cleanup expired login blocks"
                            );
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down login guard cleanup task");
                        break;
                    }
                }
            }
        })
    }

    async fn lock_key(&self, identity: &IdentityKey) -> MutexGuard<'_, ()> {
        let stripe = (self.hasher.hash_one(identity) as usize) % self.stripes.len();
        self.stripes[stripe].lock().await
    }

    fn blocked_outcome(&self, remaining: Duration) -> AttemptOutcome {
        AttemptOutcome::blocked(
            remaining,
            format!(
                "Too many failed login attempts. Please try again in {}.",
                format_minutes(remaining)
            ),
        )
    }

    fn disabled_outcome(&self) -> AttemptOutcome {
        AttemptOutcome::unblocked(self.config.max_attempts, "")
    }
}

/// Whole minutes, rounded up so a user is never told to retry too early.
fn format_minutes(duration: Duration) -> String {
    let millis = duration.num_milliseconds().max(0);
    let minutes = (millis.saturating_add(59_999) / 60_000).max(1);
    if minutes == 1 {
        "1 minute".to_string()
    } else {
        format!("{minutes} minutes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    /// Mock repository for testing
    #[derive(Default)]
    struct MockAttemptRepository {
        records: StdMutex<HashMap<IdentityKey, AttemptRecord>>,
    }

    impl MockAttemptRepository {
        fn record(&self, key: &IdentityKey) -> Option<AttemptRecord> {
            self.records.lock().unwrap().get(key).cloned()
        }
    }

    #[async_trait]
    impl AttemptRepository for MockAttemptRepository {
        async fn get(&self, key: &IdentityKey) -> Result<Option<AttemptRecord>, Error> {
            Ok(self.records.lock().unwrap().get(key).cloned())
        }

        async fn put(&self, key: &IdentityKey, record: AttemptRecord) -> Result<(), Error> {
            self.records.lock().unwrap().insert(key.clone(), record);
            Ok(())
        }

        async fn delete(&self, key: &IdentityKey) -> Result<bool, Error> {
            Ok(self.records.lock().unwrap().remove(key).is_some())
        }

        async fn scan(&self) -> Result<Vec<(IdentityKey, AttemptRecord)>, Error> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect())
        }
    }

    fn setup(
        config: AttemptGuardConfig,
    ) -> (
        AttemptGuardService<MockAttemptRepository>,
        Arc<MockAttemptRepository>,
        Arc<ManualClock>,
    ) {
        let repo = Arc::new(MockAttemptRepository::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let service = AttemptGuardService::with_clock(repo.clone(), config, clock.clone())
            .expect("valid config");
        (service, repo, clock)
    }

    fn alice() -> IdentityKey {
        IdentityKey::new("alice", Some("1.2.3.4"))
    }

    #[tokio::test]
    async fn test_first_failure_creates_record() {
        let (service, repo, clock) = setup(AttemptGuardConfig::default());

        let status = service.record_failed_attempt(&alice()).await.unwrap();
        assert!(!status.is_blocked);
        assert_eq!(status.remaining_attempts, 2);
        assert_eq!(status.block_time_remaining, None);
        assert!(!status.message.is_empty());

        let record = repo.record(&alice()).unwrap();
        assert_eq!(record.username, "alice");
        assert_eq!(record.attempts, 1);
        assert_eq!(record.last_attempt_at, clock.now());
        assert_eq!(record.blocked_until, None);
    }

    #[tokio::test]
    async fn test_last_attempt_warning() {
        let (service, _repo, _clock) = setup(AttemptGuardConfig::default());

        service.record_failed_attempt(&alice()).await.unwrap();
        let status = service.record_failed_attempt(&alice()).await.unwrap();

        assert!(!status.is_blocked);
        assert_eq!(status.remaining_attempts, 1);
        assert!(status.message.contains("last attempt"));
    }

    #[tokio::test]
    async fn test_block_after_max_attempts() {
        let (service, repo, clock) = setup(AttemptGuardConfig::default());

        for _ in 0..2 {
            service.record_failed_attempt(&alice()).await.unwrap();
        }
        let status = service.record_failed_attempt(&alice()).await.unwrap();

        assert!(status.is_blocked);
        assert_eq!(status.remaining_attempts, 0);
        assert_eq!(status.block_time_remaining, Some(Duration::minutes(30)));
        assert_eq!(status.block_time_remaining_ms(), Some(1_800_000));
        assert!(status.message.contains("30 minutes"));

        let record = repo.record(&alice()).unwrap();
        assert_eq!(record.attempts, 3);
        assert_eq!(
            record.blocked_until,
            Some(clock.now() + Duration::minutes(30))
        );
    }

    #[tokio::test]
    async fn test_failure_during_block_is_not_counted() {
        let (service, repo, clock) = setup(AttemptGuardConfig::default());

        for _ in 0..3 {
            service.record_failed_attempt(&alice()).await.unwrap();
        }
        let blocked_until = repo.record(&alice()).unwrap().blocked_until;

        clock.advance(Duration::minutes(5));
        let status = service.record_failed_attempt(&alice()).await.unwrap();

        assert!(status.is_blocked);
        assert_eq!(status.remaining_attempts, 0);
        assert_eq!(status.block_time_remaining, Some(Duration::minutes(25)));
        assert!(status.message.contains("25 minutes"));

        let record = repo.record(&alice()).unwrap();
        assert_eq!(record.attempts, 3);
        assert_eq!(record.blocked_until, blocked_until);
    }

    #[tokio::test]
    async fn test_success_resets_count() {
        let (service, repo, _clock) = setup(AttemptGuardConfig::default());
        let bob = IdentityKey::new("bob", Some("5.6.7.8"));

        for _ in 0..2 {
            service.record_failed_attempt(&bob).await.unwrap();
        }
        service.record_successful_attempt(&bob).await.unwrap();
        assert!(repo.record(&bob).is_none());

        let status = service.record_failed_attempt(&bob).await.unwrap();
        assert!(!status.is_blocked);
        assert_eq!(status.remaining_attempts, 2);
        assert_eq!(repo.record(&bob).unwrap().attempts, 1);
    }

    #[tokio::test]
    async fn test_check_if_blocked_unknown_identity() {
        let (service, repo, _clock) = setup(AttemptGuardConfig::default());

        let status = service.check_if_blocked(&alice()).await.unwrap();
        assert!(!status.is_blocked);
        assert_eq!(status.remaining_attempts, 3);
        assert_eq!(status.message, "");
        assert!(repo.record(&alice()).is_none());
    }

    #[tokio::test]
    async fn test_check_if_blocked_is_read_only() {
        let (service, repo, clock) = setup(AttemptGuardConfig::default());

        service.record_failed_attempt(&alice()).await.unwrap();
        let before = repo.record(&alice());

        let status = service.check_if_blocked(&alice()).await.unwrap();
        assert!(!status.is_blocked);
        assert_eq!(status.remaining_attempts, 2);
        assert_eq!(status.message, "");
        assert_eq!(repo.record(&alice()), before);

        for _ in 0..2 {
            service.record_failed_attempt(&alice()).await.unwrap();
        }
        let before = repo.record(&alice());

        let mut last_remaining = None;
        for _ in 0..4 {
            let status = service.check_if_blocked(&alice()).await.unwrap();
            assert!(status.is_blocked);
            if let Some(last) = last_remaining {
                assert!(status.block_time_remaining.unwrap() <= last);
            }
            last_remaining = status.block_time_remaining;
            clock.advance(Duration::minutes(7));
        }
        assert_eq!(repo.record(&alice()), before);
    }

    #[tokio::test]
    async fn test_lazy_expiry_keeps_count_for_reads() {
        let (service, repo, clock) = setup(AttemptGuardConfig::default());

        for _ in 0..3 {
            service.record_failed_attempt(&alice()).await.unwrap();
        }
        clock.advance(Duration::minutes(31));

        let status = service.check_if_blocked(&alice()).await.unwrap();
        assert!(!status.is_blocked);
        assert_eq!(status.remaining_attempts, 0);
        assert_eq!(status.block_time_remaining, None);
        assert_eq!(repo.record(&alice()).unwrap().attempts, 3);
    }

    #[tokio::test]
    async fn test_failure_after_expiry_starts_fresh_count() {
        let (service, repo, clock) = setup(AttemptGuardConfig::default());

        for _ in 0..3 {
            service.record_failed_attempt(&alice()).await.unwrap();
        }
        clock.advance(Duration::minutes(30));

        let status = service.record_failed_attempt(&alice()).await.unwrap();
        assert!(!status.is_blocked);
        assert_eq!(status.remaining_attempts, 2);

        let record = repo.record(&alice()).unwrap();
        assert_eq!(record.attempts, 1);
        assert_eq!(record.blocked_until, None);
    }

    #[tokio::test]
    async fn test_clear_attempts_lifts_block() {
        let (service, repo, _clock) = setup(AttemptGuardConfig::default());

        for _ in 0..3 {
            service.record_failed_attempt(&alice()).await.unwrap();
        }
        assert!(service.clear_attempts(&alice()).await.unwrap());
        assert!(repo.record(&alice()).is_none());
        assert!(!service.check_if_blocked(&alice()).await.unwrap().is_blocked);

        assert!(!service.clear_attempts(&alice()).await.unwrap());
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_expired_blocks() {
        let (service, repo, clock) = setup(AttemptGuardConfig::default());
        let blocked = alice();
        let pending = IdentityKey::new("carol", Some("9.9.9.9"));

        for _ in 0..3 {
            service.record_failed_attempt(&blocked).await.unwrap();
        }
        service.record_failed_attempt(&pending).await.unwrap();

        // Block still active: nothing to sweep
        assert_eq!(service.cleanup_expired_blocks().await.unwrap(), 0);
        assert!(repo.record(&blocked).is_some());

        clock.advance(Duration::minutes(31));
        assert_eq!(service.cleanup_expired_blocks().await.unwrap(), 1);
        assert!(repo.record(&blocked).is_none());
        assert_eq!(repo.record(&pending).unwrap().attempts, 1);
    }

    #[tokio::test]
    async fn test_attempt_stats() {
        let (service, _repo, clock) = setup(AttemptGuardConfig::default());
        let bob = IdentityKey::new("bob", None);

        for _ in 0..3 {
            service.record_failed_attempt(&alice()).await.unwrap();
        }
        service.record_failed_attempt(&bob).await.unwrap();

        let stats = service.get_attempt_stats().await.unwrap();
        assert_eq!(stats.total_blocked, 1);
        assert_eq!(stats.total_attempts, 4);

        clock.advance(Duration::minutes(31));
        let stats = service.get_attempt_stats().await.unwrap();
        assert_eq!(stats.total_blocked, 0);
        assert_eq!(stats.total_attempts, 4);
    }

    #[tokio::test]
    async fn test_disabled_protection_does_not_record() {
        let (service, repo, clock) = setup(AttemptGuardConfig::disabled());
        assert!(!service.is_enabled());

        for _ in 0..5 {
            let status = service.record_failed_attempt(&alice()).await.unwrap();
            assert!(!status.is_blocked);
            assert_eq!(status.remaining_attempts, 3);
        }
        assert!(repo.record(&alice()).is_none());
        let status = service.check_if_blocked(&alice()).await.unwrap();
        assert!(!status.is_blocked);
        assert_eq!(status.remaining_attempts, 3);

        // Records left from before protection was turned off are still managed
        let bob = IdentityKey::new("bob", None);
        let carol = IdentityKey::new("carol", None);
        for key in [&bob, &carol] {
            let mut record = AttemptRecord::new(key.username(), clock.now());
            record.attempts = 2;
            repo.put(key, record).await.unwrap();
        }
        assert_eq!(service.get_attempt_stats().await.unwrap().total_attempts, 4);
        service.record_successful_attempt(&bob).await.unwrap();
        assert!(repo.record(&bob).is_none());
        assert!(service.clear_attempts(&carol).await.unwrap());
        assert!(repo.record(&carol).is_none());
    }

    #[tokio::test]
    async fn test_different_identities_tracked_separately() {
        let config = AttemptGuardConfig {
            max_attempts: 2,
            ..Default::default()
        };
        let (service, _repo, _clock) = setup(config);
        let same_user_other_origin = IdentityKey::new("alice", Some("4.3.2.1"));

        for _ in 0..2 {
            service.record_failed_attempt(&alice()).await.unwrap();
        }

        assert!(service.check_if_blocked(&alice()).await.unwrap().is_blocked);
        let status = service
            .check_if_blocked(&same_user_other_origin)
            .await
            .unwrap();
        assert!(!status.is_blocked);
        assert_eq!(status.remaining_attempts, 2);
    }

    #[tokio::test]
    async fn test_single_attempt_threshold_blocks_immediately() {
        let config = AttemptGuardConfig {
            max_attempts: 1,
            block_duration: Duration::minutes(15),
            ..Default::default()
        };
        let (service, _repo, _clock) = setup(config);

        let status = service.record_failed_attempt(&alice()).await.unwrap();
        assert!(status.is_blocked);
        assert_eq!(status.retry_after_seconds(), Some(900));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_failures_are_not_lost() {
        let config = AttemptGuardConfig {
            max_attempts: 50,
            ..Default::default()
        };
        let (service, repo, _clock) = setup(config);
        let service = Arc::new(service);

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.record_failed_attempt(&alice()).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(repo.record(&alice()).unwrap().attempts, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_sweeps_and_stops() {
        let (service, repo, clock) = setup(AttemptGuardConfig::default());
        let service = Arc::new(service);

        for _ in 0..3 {
            service.record_failed_attempt(&alice()).await.unwrap();
        }
        clock.advance(Duration::minutes(31));

        let (tx, rx) = watch::channel(false);
        let handle = service.start_cleanup_task(rx);

        // The first tick fires immediately
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(repo.record(&alice()).is_none());

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[test]
    fn test_constructor_rejects_out_of_range_config() {
        let repo = Arc::new(MockAttemptRepository::default());

        let zero_block = AttemptGuardConfig {
            block_duration: Duration::zero(),
            ..Default::default()
        };
        let err = AttemptGuardService::new(repo.clone(), zero_block)
            .err()
            .expect("zero block duration should be rejected");
        assert!(err.is_config_error());

        let negative_block = AttemptGuardConfig {
            block_duration: Duration::minutes(-5),
            ..Default::default()
        };
        assert!(AttemptGuardService::new(repo.clone(), negative_block).is_err());

        let zero_attempts = AttemptGuardConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(AttemptGuardService::new(repo.clone(), zero_attempts).is_err());

        let huge_block = AttemptGuardConfig {
            block_duration: Duration::days(365 * 300_000),
            ..Default::default()
        };
        let err = AttemptGuardService::new(repo, huge_block)
            .err()
            .expect("oversized block duration should be rejected");
        assert!(matches!(
            err,
            Error::Config(crate::error::ConfigError::BlockDurationTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_block_near_end_of_time_does_not_overflow() {
        let config = AttemptGuardConfig {
            max_attempts: 1,
            block_duration: Duration::days(crate::storage::MAX_BLOCK_DURATION_DAYS),
            ..Default::default()
        };
        let (service, repo, clock) = setup(config);
        clock.set(DateTime::<Utc>::MAX_UTC - Duration::days(1));

        let status = service.record_failed_attempt(&alice()).await.unwrap();
        assert!(status.is_blocked);

        let blocked_until = repo.record(&alice()).unwrap().blocked_until.unwrap();
        assert_eq!(blocked_until, DateTime::<Utc>::MAX_UTC);
        assert!(blocked_until > clock.now());
        assert!(service.check_if_blocked(&alice()).await.unwrap().is_blocked);
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(Duration::minutes(30)), "30 minutes");
        assert_eq!(format_minutes(Duration::seconds(61)), "2 minutes");
        assert_eq!(format_minutes(Duration::seconds(30)), "1 minute");
        assert_eq!(format_minutes(Duration::zero()), "1 minute");
        assert_eq!(
            format_minutes(Duration::milliseconds(i64::MAX)),
            format!("{} minutes", i64::MAX / 60_000)
        );
    }
}
