//! # Vesting
//!
//! ```text
//! registry.rs — lock records, creation, duplicate rejection
//! engine.rs   — elapsed-period accounting and release computation
//! ```

pub mod engine;
pub mod registry;

pub use engine::{release, ReleaseOutcome};
pub use registry::{validate_schedule, VestingLock, VestingRegistry};
