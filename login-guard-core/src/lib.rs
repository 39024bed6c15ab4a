//! Core functionality for the login-guard project
//!
//! This crate contains the building blocks for brute force login protection:
//! the [`IdentityKey`] that names a tracked caller, the [`AttemptRecord`] kept
//! for it, the [`AttemptRepository`] storage trait and the
//! [`AttemptGuardService`] that decides when an identity is blocked.
//!
//! Storage backends depend on this crate and implement [`AttemptRepository`].
//! Application code normally uses the `login-guard` facade instead.
pub mod clock;
pub mod error;
pub mod identity;
pub mod repositories;
pub mod services;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::Error;
pub use identity::IdentityKey;
pub use repositories::AttemptRepository;
pub use services::AttemptGuardService;
pub use storage::{AttemptGuardConfig, AttemptOutcome, AttemptRecord, AttemptStats};
