//! Onset decision: threshold comparison plus time-based debounce.
//!
//! [`OnsetDebouncer`] is the only stateful piece of the per-block path.
//! It lives inside the capture callback closure, owned by exactly one
//! running loop, so it needs no lock.

use std::time::{Duration, Instant};

use crate::audio::VolumeHistory;
use crate::config::DetectorConfig;

// ---------------------------------------------------------------------------
// OnsetDebouncer
// ---------------------------------------------------------------------------

/// Stateful trigger decision.
///
/// A block triggers iff its loudness is **strictly** above the threshold
/// and **strictly** more than the debounce interval has passed since the
/// last trigger — ties never trigger, biasing toward fewer false
/// positives.  The first qualifying block ever always triggers.
///
/// Every observed loudness is appended to a rolling [`VolumeHistory`].
/// The history has no decision authority; it is an observable hook for
/// future smoothing.
///
/// # Example
///
/// ```rust
/// use std::time::{Duration, Instant};
/// use strum_click::config::DetectorConfig;
/// use strum_click::detector::OnsetDebouncer;
///
/// let mut d = OnsetDebouncer::new(&DetectorConfig::default());
/// let t0 = Instant::now();
/// assert!(d.should_trigger(0.02, t0));                                  // first onset
/// assert!(!d.should_trigger(0.05, t0 + Duration::from_millis(50)));     // debounced
/// assert!(d.should_trigger(0.015, t0 + Duration::from_millis(250)));    // interval passed
/// ```
#[derive(Debug, Clone)]
pub struct OnsetDebouncer {
    threshold: f32,
    debounce: Duration,
    history: VolumeHistory,
    last_trigger: Option<Instant>,
}

impl OnsetDebouncer {
    /// Fresh debouncer for one run: empty history, no prior trigger.
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            threshold: config.threshold,
            debounce: Duration::from_secs_f32(config.debounce_secs),
            history: VolumeHistory::new(config.history_size),
            last_trigger: None,
        }
    }

    /// Record `volume` and decide whether to trigger at `now`.
    ///
    /// On a positive decision the trigger timestamp is updated to `now`.
    pub fn should_trigger(&mut self, volume: f32, now: Instant) -> bool {
        self.history.push(volume);

        let volume_spike = volume > self.threshold;
        let interval_passed = match self.last_trigger {
            None => true,
            Some(last) => now.duration_since(last) > self.debounce,
        };

        if volume_spike && interval_passed {
            self.last_trigger = Some(now);
            return true;
        }
        false
    }

    /// The rolling loudness history (observational only).
    pub fn history(&self) -> &VolumeHistory {
        &self.history
    }

    /// Timestamp of the last trigger, or `None` before the first one.
    pub fn last_trigger(&self) -> Option<Instant> {
        self.last_trigger
    }

    /// The threshold this debouncer compares against.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
