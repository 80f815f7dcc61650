//! Capture loop and run-state machine.
//!
//! [`OnsetDetector`] owns the scoped acquisition of the audio stream:
//!
//! ```text
//! Idle ──start()──▶ Running ──stop() / stream fault──▶ Idle
//! ```
//!
//! `start` spawns a worker thread that opens the stream via the configured
//! [`CaptureBackend`], keeps the RAII guard alive, and polls the stop flag
//! and the fault channel at 100 ms granularity.  The per-block work (RMS +
//! debounce) runs synchronously inside the backend's callback; qualifying
//! blocks are handed to the [`ActionDispatcher`] without waiting.  The
//! stream guard is created and dropped on the worker thread because cpal
//! streams are not `Send` everywhere.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::audio::{block_rms, BlockFn, CaptureBackend, StreamError};
use crate::config::{ConfigError, DetectorConfig};
use crate::dispatch::{ActionDispatcher, TriggerEvent};

use super::debounce::OnsetDebouncer;

/// Granularity of the worker's stop/fault poll.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// RunState
// ---------------------------------------------------------------------------

/// States of the capture loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No stream is open; configuration may be changed.
    Idle,
    /// A stream is open and blocks are being processed.
    Running,
}

impl RunState {
    /// Short label for status display.
    pub fn label(&self) -> &'static str {
        match self {
            RunState::Idle => "Idle",
            RunState::Running => "Running",
        }
    }
}

// ---------------------------------------------------------------------------
// DetectorError
// ---------------------------------------------------------------------------

/// Errors surfaced by [`OnsetDetector::start`].
#[derive(Debug, Error)]
pub enum DetectorError {
    /// The supplied configuration failed validation; the detector stays Idle.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The backend could not open or start the stream; the detector stays
    /// Idle.  Never auto-retried.
    #[error(transparent)]
    Stream(#[from] StreamError),
}

// ---------------------------------------------------------------------------
// OnsetDetector
// ---------------------------------------------------------------------------

/// Drives one capture run at a time.
///
/// Shared-state layout mirrors the concurrency contract: the detector
/// state (debouncer) lives inside the callback closure and is touched only
/// from the callback context; the run state, stop flag, and last fault are
/// the only cross-thread values.
pub struct OnsetDetector {
    state: Arc<Mutex<RunState>>,
    stop: Arc<AtomicBool>,
    dispatcher: ActionDispatcher,
    last_fault: Arc<Mutex<Option<StreamError>>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl OnsetDetector {
    /// Create an Idle detector that hands triggers to `dispatcher`.
    pub fn new(dispatcher: ActionDispatcher) -> Self {
        Self {
            state: Arc::new(Mutex::new(RunState::Idle)),
            stop: Arc::new(AtomicBool::new(false)),
            dispatcher,
            last_fault: Arc::new(Mutex::new(None)),
            worker: Mutex::new(None),
        }
    }

    /// Start a run with `config` on `backend`.
    ///
    /// Validates the config, clears the previous run's detector state,
    /// opens the stream, and moves to Running.  Calling `start` while
    /// already Running is a logged no-op, not an error.
    ///
    /// # Errors
    ///
    /// [`DetectorError::Config`] for an invalid config,
    /// [`DetectorError::Stream`] when the backend fails to open the
    /// stream.  Either way the detector remains Idle.
    pub fn start<B: CaptureBackend>(
        &self,
        config: DetectorConfig,
        mut backend: B,
    ) -> Result<(), DetectorError> {
        config.validate()?;

        {
            let mut state = self.state.lock().unwrap();
            if *state == RunState::Running {
                log::warn!("detector already running; start ignored");
                return Ok(());
            }
            *state = RunState::Running;
        }

        self.stop.store(false, Ordering::SeqCst);
        *self.last_fault.lock().unwrap() = None;

        let state = Arc::clone(&self.state);
        let stop = Arc::clone(&self.stop);
        let last_fault = Arc::clone(&self.last_fault);
        let dispatcher = self.dispatcher.clone();

        // Rendezvous so open errors surface to the caller.
        let (open_tx, open_rx) = mpsc::channel::<Result<(), StreamError>>();

        let handle = thread::Builder::new()
            .name("onset-capture".into())
            .spawn(move || {
                let (fault_tx, fault_rx) = mpsc::channel::<StreamError>();

                // Fresh per-run state: empty history, no prior trigger.
                let mut debouncer = OnsetDebouncer::new(&config);
                let stop_flag = Arc::clone(&stop);
                let on_block: BlockFn = Box::new(move |samples, channels| {
                    // Checked at callback entry: once signalled, in-flight
                    // blocks are dropped without processing.
                    if stop_flag.load(Ordering::SeqCst) {
                        return;
                    }
                    let volume = block_rms(samples, channels);
                    let now = Instant::now();
                    if debouncer.should_trigger(volume, now) {
                        dispatcher.dispatch(TriggerEvent { at: now, volume });
                    }
                });

                let guard = match backend.open(&config, on_block, fault_tx) {
                    Ok(guard) => {
                        let _ = open_tx.send(Ok(()));
                        guard
                    }
                    Err(e) => {
                        let _ = open_tx.send(Err(e));
                        *state.lock().unwrap() = RunState::Idle;
                        return;
                    }
                };

                log::info!("capture running");

                // Single stop path: user stop and stream fault both land here.
                loop {
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    match fault_rx.recv_timeout(POLL_INTERVAL) {
                        Ok(fault) => {
                            log::error!("stream fault, stopping run: {fault}");
                            *last_fault.lock().unwrap() = Some(fault);
                            stop.store(true, Ordering::SeqCst);
                            break;
                        }
                        Err(mpsc::RecvTimeoutError::Timeout) => {}
                        Err(mpsc::RecvTimeoutError::Disconnected) => {
                            // Backend dropped its fault sender; keep
                            // polling the stop flag.
                            thread::sleep(POLL_INTERVAL);
                        }
                    }
                }

                // Close the stream on this thread, then report Idle.
                drop(guard);
                *state.lock().unwrap() = RunState::Idle;
                log::info!("capture stopped");
            })
            .expect("failed to spawn onset-capture thread");

        match open_rx.recv() {
            Ok(Ok(())) => {
                *self.worker.lock().unwrap() = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(DetectorError::Stream(e))
            }
            Err(_) => {
                // Worker died before reporting; make sure we end up Idle.
                let _ = handle.join();
                *self.state.lock().unwrap() = RunState::Idle;
                Err(DetectorError::Stream(StreamError::Runtime(
                    "capture worker exited before opening the stream".into(),
                )))
            }
        }
    }

    /// Signal the stop flag and wait for the worker to close the stream.
    ///
    /// Idempotent: stopping an Idle detector is a no-op and never errors.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let handle = self.worker.lock().unwrap().take();
        match handle {
            Some(h) => {
                let _ = h.join();
            }
            None => {
                log::debug!("stop on idle detector ignored");
            }
        }
    }

    /// Current run state.
    pub fn state(&self) -> RunState {
        *self.state.lock().unwrap()
    }

    /// Returns `true` while a run is active.
    pub fn is_running(&self) -> bool {
        self.state() == RunState::Running
    }

    /// Take the fault that ended the last run, if any.
    ///
    /// The front-end calls this after a run ends to show remediation
    /// guidance.  Consuming the fault clears it.
    pub fn take_fault(&self) -> Option<StreamError> {
        self.last_fault.lock().unwrap().take()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::testing::{CountingClick, FailOpenBackend, FakeBackend};
    use std::sync::atomic::Ordering as AtomicOrdering;

    fn quick_config() -> DetectorConfig {
        DetectorConfig {
            threshold: 0.01,
            debounce_secs: 0.001,
            ..Default::default()
        }
    }

    fn make_detector() -> (OnsetDetector, Arc<CountingClick>) {
        let action = CountingClick::new();
        let (dispatcher, _errors) =
            ActionDispatcher::new(tokio::runtime::Handle::current(), action.clone());
        (OnsetDetector::new(dispatcher), action)
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    // ---- State machine -----------------------------------------------------

    #[tokio::test(flavor = "multi_thread")]
    async fn start_moves_to_running_and_stop_returns_to_idle() {
        let (detector, _action) = make_detector();
        assert_eq!(detector.state(), RunState::Idle);

        detector
            .start(quick_config(), FakeBackend::loud_blocks())
            .unwrap();
        assert_eq!(detector.state(), RunState::Running);

        detector.stop();
        assert_eq!(detector.state(), RunState::Idle);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn start_while_running_is_a_no_op() {
        let (detector, _action) = make_detector();
        detector
            .start(quick_config(), FakeBackend::loud_blocks())
            .unwrap();

        // Second start must succeed without disturbing the run.
        detector
            .start(quick_config(), FakeBackend::loud_blocks())
            .unwrap();
        assert_eq!(detector.state(), RunState::Running);

        detector.stop();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_on_idle_detector_is_a_no_op() {
        let (detector, _action) = make_detector();
        detector.stop();
        detector.stop();
        assert_eq!(detector.state(), RunState::Idle);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn detector_is_restartable_after_stop() {
        let (detector, action) = make_detector();

        detector
            .start(quick_config(), FakeBackend::loud_blocks())
            .unwrap();
        sleep_ms(100).await;
        detector.stop();
        let first_run = action.count.load(AtomicOrdering::SeqCst);
        assert!(first_run > 0, "first run produced no clicks");

        detector
            .start(quick_config(), FakeBackend::loud_blocks())
            .unwrap();
        sleep_ms(100).await;
        detector.stop();
        assert!(action.count.load(AtomicOrdering::SeqCst) > first_run);
    }

    // ---- Config / open failures --------------------------------------------

    #[tokio::test(flavor = "multi_thread")]
    async fn invalid_config_fails_start_and_stays_idle() {
        let (detector, _action) = make_detector();
        let bad = DetectorConfig {
            threshold: 0.0,
            ..Default::default()
        };

        let err = detector.start(bad, FakeBackend::loud_blocks()).unwrap_err();
        assert!(matches!(err, DetectorError::Config(_)));
        assert_eq!(detector.state(), RunState::Idle);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn open_failure_fails_start_and_stays_idle() {
        let (detector, _action) = make_detector();

        let err = detector
            .start(quick_config(), FailOpenBackend)
            .unwrap_err();
        assert!(matches!(err, DetectorError::Stream(_)));
        assert_eq!(detector.state(), RunState::Idle);

        // A failed start must not poison later starts.
        detector
            .start(quick_config(), FakeBackend::loud_blocks())
            .unwrap();
        detector.stop();
    }

    // ---- Triggering --------------------------------------------------------

    #[tokio::test(flavor = "multi_thread")]
    async fn loud_blocks_produce_clicks() {
        let (detector, action) = make_detector();
        detector
            .start(quick_config(), FakeBackend::loud_blocks())
            .unwrap();

        sleep_ms(200).await;
        detector.stop();
        sleep_ms(100).await; // let spawned click tasks finish

        assert!(action.count.load(AtomicOrdering::SeqCst) > 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn silent_blocks_produce_no_clicks() {
        let (detector, action) = make_detector();
        detector
            .start(quick_config(), FakeBackend::silent_blocks())
            .unwrap();

        sleep_ms(200).await;
        detector.stop();
        sleep_ms(100).await;

        assert_eq!(action.count.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn debounce_limits_click_rate() {
        let (detector, action) = make_detector();
        // Loud block every ~10 ms, but a 150 ms debounce: over 300 ms we
        // expect at most 3 clicks (and at least 1).
        let config = DetectorConfig {
            threshold: 0.01,
            debounce_secs: 0.15,
            ..Default::default()
        };
        detector
            .start(config, FakeBackend::loud_blocks())
            .unwrap();

        sleep_ms(300).await;
        detector.stop();
        sleep_ms(100).await;

        let clicks = action.count.load(AtomicOrdering::SeqCst);
        assert!((1..=3).contains(&clicks), "clicks = {clicks}");
    }

    // ---- Stream fault ------------------------------------------------------

    #[tokio::test(flavor = "multi_thread")]
    async fn stream_fault_returns_to_idle_and_stops_processing() {
        let (detector, action) = make_detector();
        // Fault after 3 blocks; feeder keeps delivering loud blocks after
        // the fault, which must all be dropped.
        detector
            .start(quick_config(), FakeBackend::loud_blocks().fault_after(3))
            .unwrap();

        sleep_ms(400).await;
        assert_eq!(detector.state(), RunState::Idle);
        assert!(detector.take_fault().is_some());

        let after_fault = action.count.load(AtomicOrdering::SeqCst);
        sleep_ms(200).await;
        assert_eq!(
            action.count.load(AtomicOrdering::SeqCst),
            after_fault,
            "blocks were processed after the fault"
        );

        // stop() after a fault-terminated run stays a no-op.
        detector.stop();
        assert_eq!(detector.state(), RunState::Idle);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn take_fault_is_consumed_once() {
        let (detector, _action) = make_detector();
        detector
            .start(quick_config(), FakeBackend::loud_blocks().fault_after(1))
            .unwrap();

        sleep_ms(400).await;
        assert!(detector.take_fault().is_some());
        assert!(detector.take_fault().is_none());
        detector.stop();
    }

    // ---- Labels ------------------------------------------------------------

    #[test]
    fn run_state_labels() {
        assert_eq!(RunState::Idle.label(), "Idle");
        assert_eq!(RunState::Running.label(), "Running");
    }
}
