//! Repository traits for data access layer
//!
//! Services talk to storage only through these traits, so a backend can be
//! swapped without touching any blocking policy.

pub mod attempt;

pub use attempt::AttemptRepository;
