//! Detector configuration and validation.
//!
//! [`DetectorConfig`] is a plain value: the front-end edits its own copy
//! while the detector is Idle and passes a snapshot into every
//! [`start`](crate::detector::OnsetDetector::start) call.  Nothing is
//! persisted across runs of the process.

use thiserror::Error;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors raised when a [`DetectorConfig`] fails validation.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Threshold must be finite and in `(0.0, 1.0]`.
    #[error("threshold must be finite and in (0.0, 1.0], got {0}")]
    InvalidThreshold(f32),

    /// Debounce interval must be finite and strictly positive.
    #[error("debounce interval must be finite and > 0 seconds, got {0}")]
    InvalidDebounce(f32),

    /// History window must hold at least one reading.
    #[error("history size must be >= 1")]
    ZeroHistory,

    /// Sample rate must be strictly positive.
    #[error("sample rate must be > 0 Hz")]
    ZeroSampleRate,

    /// Block size must be strictly positive.
    #[error("block size must be > 0 samples")]
    ZeroBlockSize,
}

// ---------------------------------------------------------------------------
// DetectorConfig
// ---------------------------------------------------------------------------

/// Settings for one detector run.
///
/// Defaults match a typical guitar-cable setup: a quiet-room threshold of
/// `0.01`, a 200 ms debounce, and 1024-sample blocks at 44.1 kHz.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Input device index from [`crate::audio::list_input_devices`];
    /// `None` means the system default input device.
    pub device: Option<usize>,

    /// RMS loudness above which a block qualifies as an onset, in
    /// `(0.0, 1.0]`.  The comparison is strict: a block exactly at the
    /// threshold does not trigger.
    pub threshold: f32,

    /// Minimum seconds between two clicks.  Also strict: a block landing
    /// exactly on the debounce boundary does not trigger.
    pub debounce_secs: f32,

    /// Number of recent loudness readings kept in the rolling history.
    ///
    /// The history is observational only — it has no effect on the trigger
    /// decision.  It is kept as a hook for future smoothing.
    pub history_size: usize,

    /// Requested sample rate in Hz.  The capture backend may substitute
    /// the device's preferred rate (logged when it does).
    pub sample_rate: u32,

    /// Requested samples per callback block.
    pub block_size: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            device: None,
            threshold: 0.01,
            debounce_secs: 0.2,
            history_size: 5,
            sample_rate: 44_100,
            block_size: 1024,
        }
    }
}

impl DetectorConfig {
    /// Validate every field.
    ///
    /// Called by [`crate::detector::OnsetDetector::start`] before any
    /// stream resource is touched, so an invalid config leaves the
    /// detector Idle.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.threshold.is_finite() || self.threshold <= 0.0 || self.threshold > 1.0 {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        if !self.debounce_secs.is_finite() || self.debounce_secs <= 0.0 {
            return Err(ConfigError::InvalidDebounce(self.debounce_secs));
        }
        if self.history_size == 0 {
            return Err(ConfigError::ZeroHistory);
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if self.block_size == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
