//! Onset detection — debounce decision, capture loop, calibration mode.
//!
//! [`OnsetDebouncer`] holds the per-run decision state, [`OnsetDetector`]
//! owns the stream lifecycle and the `Idle ⇄ Running` state machine, and
//! [`run_level_meter`] reuses the capture pipeline for threshold
//! calibration without triggering anything.

pub mod debounce;
pub mod meter;
pub mod runner;

#[cfg(test)]
pub mod testing;

pub use debounce::OnsetDebouncer;
pub use meter::{run_level_meter, LevelReading};
pub use runner::{DetectorError, OnsetDetector, RunState};
