use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors reported by an [`AttemptRepository`](crate::repositories::AttemptRepository) backend.
///
/// The guard itself never fails; these only surface when an external store does.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_attempts must be at least 1")]
    ZeroMaxAttempts,

    #[error("block_duration must be positive")]
    NonPositiveBlockDuration,

    #[error("block_duration must not exceed {max_days} days")]
    BlockDurationTooLarge { max_days: i64 },

    #[error("cleanup_interval must be positive")]
    NonPositiveCleanupInterval,
}

impl Error {
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}
