//! Service layer for business logic
//!
//! This module contains the concrete service that owns all attempt tracking
//! and blocking policy.

pub mod attempt_guard;

pub use attempt_guard::AttemptGuardService;
