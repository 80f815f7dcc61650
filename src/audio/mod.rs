//! Audio layer — device enumeration, cpal capture, loudness estimation.
//!
//! # Pipeline
//!
//! ```text
//! Instrument → cpal callback → block_rms → OnsetDebouncer → TriggerEvent
//! ```
//!
//! The capture side is behind the [`CaptureBackend`] trait so the detector
//! and calibration loops can be exercised in tests with synthetic blocks.

pub mod capture;
pub mod device;
pub mod history;
pub mod volume;

pub use capture::{BlockFn, CaptureBackend, CpalBackend, StreamError, StreamGuard};
pub use device::{list_input_devices, suggest_instrument_device, InputDeviceInfo};
pub use history::VolumeHistory;
pub use volume::block_rms;
