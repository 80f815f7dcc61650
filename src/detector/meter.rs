//! Calibration / level-meter mode.
//!
//! Runs the same stream-acquisition + RMS pipeline as the detector —
//! without the debouncer or dispatcher — for a fixed duration, streaming
//! `(timestamp, loudness)` pairs to the caller so a presentation layer
//! can render a bar meter.  The user plays their instrument, watches the
//! levels, and picks a threshold just below what a strum reaches.

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crate::audio::{block_rms, BlockFn, CaptureBackend};
use crate::config::DetectorConfig;

use super::runner::DetectorError;

/// Granularity of the deadline/fault poll.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// LevelReading
// ---------------------------------------------------------------------------

/// One loudness sample of the calibration stream.
#[derive(Debug, Clone, Copy)]
pub struct LevelReading {
    /// When the block was processed.
    pub at: Instant,
    /// RMS loudness of the block.
    pub volume: f32,
}

// ---------------------------------------------------------------------------
// run_level_meter
// ---------------------------------------------------------------------------

/// Monitor input levels for `duration`, sending a [`LevelReading`] per
/// block over `tx`.
///
/// Blocks the calling thread until the duration elapses (checked at
/// 100 ms granularity), then releases the stream and returns `Ok`.  A
/// stream fault ends the session early and is returned as
/// [`DetectorError::Stream`].  Send errors on `tx` are ignored so a
/// departed presentation layer never breaks the session.
///
/// # Errors
///
/// [`DetectorError::Config`] for an invalid config (before any stream is
/// opened), [`DetectorError::Stream`] for open failures and mid-session
/// faults.
pub fn run_level_meter<B: CaptureBackend>(
    config: &DetectorConfig,
    duration: Duration,
    mut backend: B,
    tx: mpsc::Sender<LevelReading>,
) -> Result<(), DetectorError> {
    config.validate()?;

    let (fault_tx, fault_rx) = mpsc::channel();

    let on_block: BlockFn = Box::new(move |samples, channels| {
        let reading = LevelReading {
            at: Instant::now(),
            volume: block_rms(samples, channels),
        };
        let _ = tx.send(reading);
    });

    let guard = backend.open(config, on_block, fault_tx)?;
    log::info!("level meter running for {:.1} s", duration.as_secs_f32());

    let deadline = Instant::now() + duration;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match fault_rx.recv_timeout(remaining.min(POLL_INTERVAL)) {
            Ok(fault) => {
                log::error!("stream fault during level meter: {fault}");
                drop(guard);
                return Err(DetectorError::Stream(fault));
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                thread::sleep(remaining.min(POLL_INTERVAL));
            }
        }
    }

    drop(guard);
    log::info!("level meter finished");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
