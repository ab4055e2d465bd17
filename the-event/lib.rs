//! Deterministic time for single-threaded event handling.
//!
//! Nothing in here sleeps or spawns. The embedder owns the clock and drives
//! it forward, which keeps every deferred flush reproducible in tests.

pub mod throttle;
pub mod timer;

pub use throttle::{
  Throttle,
  ThrottleDecision,
};
pub use timer::Timers;
