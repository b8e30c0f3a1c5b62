//! Unbounded, self-delaying probe loop with a single-flight guard.

mod controller;
mod state;

pub use controller::{StartOutcome, StopOutcome, StressController};
pub use state::{StopReason, StressStatus};
