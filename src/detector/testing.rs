//! Test doubles for the detector and calibration loops.
//!
//! [`FakeBackend`] feeds synthetic constant-amplitude blocks from a feeder
//! thread at a fixed cadence and can inject a stream fault after a given
//! number of blocks.  Dropping the returned guard stops the feeder, the
//! same way dropping a cpal stream stops real callbacks.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use crate::audio::{BlockFn, CaptureBackend, StreamError, StreamGuard};
use crate::click::{ActionError, ClickAction};
use crate::config::DetectorConfig;

// ---------------------------------------------------------------------------
// CountingClick
// ---------------------------------------------------------------------------

/// Click action that counts invocations instead of moving the pointer.
pub struct CountingClick {
    pub count: AtomicUsize,
}

impl CountingClick {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            count: AtomicUsize::new(0),
        })
    }
}

impl ClickAction for CountingClick {
    fn click(&self) -> Result<(), ActionError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeBackend
// ---------------------------------------------------------------------------

/// Capture backend producing synthetic blocks on a feeder thread.
pub struct FakeBackend {
    amplitude: f32,
    interval: Duration,
    fault_after: Option<usize>,
}

impl FakeBackend {
    /// Blocks with constant amplitude 0.5 every 10 ms — RMS 0.5, well
    /// above any test threshold.
    pub fn loud_blocks() -> Self {
        Self {
            amplitude: 0.5,
            interval: Duration::from_millis(10),
            fault_after: None,
        }
    }

    /// All-zero blocks every 10 ms.
    pub fn silent_blocks() -> Self {
        Self {
            amplitude: 0.0,
            interval: Duration::from_millis(10),
            fault_after: None,
        }
    }

    /// Send a synthetic stream fault after `blocks` delivered blocks.
    /// The feeder keeps delivering afterwards, mimicking callbacks that
    /// are already in flight when a device fails.
    pub fn fault_after(mut self, blocks: usize) -> Self {
        self.fault_after = Some(blocks);
        self
    }
}

struct FakeStreamGuard {
    alive: Arc<AtomicBool>,
}

impl StreamGuard for FakeStreamGuard {}

impl Drop for FakeStreamGuard {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

impl CaptureBackend for FakeBackend {
    fn open(
        &mut self,
        config: &DetectorConfig,
        mut on_block: BlockFn,
        fault_tx: mpsc::Sender<StreamError>,
    ) -> Result<Box<dyn StreamGuard>, StreamError> {
        let alive = Arc::new(AtomicBool::new(true));
        let feeder_alive = Arc::clone(&alive);

        let block = vec![self.amplitude; config.block_size as usize];
        let interval = self.interval;
        let fault_after = self.fault_after;

        thread::Builder::new()
            .name("fake-capture".into())
            .spawn(move || {
                let mut delivered = 0_usize;
                while feeder_alive.load(Ordering::SeqCst) {
                    if fault_after == Some(delivered) {
                        let _ = fault_tx.send(StreamError::Runtime("synthetic fault".into()));
                    }
                    on_block(&block, 1);
                    delivered += 1;
                    thread::sleep(interval);
                }
            })
            .expect("failed to spawn fake-capture thread");

        Ok(Box::new(FakeStreamGuard { alive }))
    }
}

// ---------------------------------------------------------------------------
// FailOpenBackend
// ---------------------------------------------------------------------------

/// Backend whose `open` always fails, for start-failure paths.
pub struct FailOpenBackend;

impl CaptureBackend for FailOpenBackend {
    fn open(
        &mut self,
        _config: &DetectorConfig,
        _on_block: BlockFn,
        _fault_tx: mpsc::Sender<StreamError>,
    ) -> Result<Box<dyn StreamGuard>, StreamError> {
        Err(StreamError::NoDevice)
    }
}
