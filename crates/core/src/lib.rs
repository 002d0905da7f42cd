//! Gamification core for the fitness backend.
//!
//! Three independent, side-effect-free engines turn raw activity into
//! motivational state:
//!
//! - [`level::LevelEngine`]: cumulative XP to a discrete level.
//! - [`streak::StreakEngine`]: consecutive-day streaks and streak badges.
//! - [`milestone::MilestoneEngine`]: progress toward numeric goals.
//!
//! The crate performs no I/O. Callers load a snapshot, invoke an engine
//! operation and persist the returned snapshot; serialising read-modify-write
//! cycles per record is the caller's job.

pub mod badge;
pub mod config;
pub mod error;
pub mod level;
pub mod milestone;
pub mod streak;
pub mod types;
pub mod validation;

pub use error::CoreError;
