//! Fire-and-forget click dispatch.
//!
//! [`ActionDispatcher`] decouples the time-critical audio callback from
//! the (potentially slow) click action.  Each [`TriggerEvent`] becomes one
//! independent `tokio::task::spawn_blocking` unit; the caller returns
//! immediately.  Overlapping actions are neither ordered nor serialized —
//! the debounce interval is the only thing limiting click frequency.
//!
//! Action failures are logged and forwarded over an unbounded error
//! channel that the front-end drains without blocking; they never touch
//! the run's state machine.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;

use crate::click::{ActionError, ClickAction};

// ---------------------------------------------------------------------------
// TriggerEvent
// ---------------------------------------------------------------------------

/// One qualifying onset, produced by the capture loop and consumed
/// immediately by the dispatcher.
#[derive(Debug, Clone, Copy)]
pub struct TriggerEvent {
    /// When the block that crossed the threshold was processed.
    pub at: Instant,
    /// The RMS loudness that crossed the threshold.
    pub volume: f32,
}

// ---------------------------------------------------------------------------
// ActionDispatcher
// ---------------------------------------------------------------------------

/// Spawns one blocking task per trigger and never waits on it.
///
/// Cheap to clone; clones share the action and the error channel.
#[derive(Clone)]
pub struct ActionDispatcher {
    handle: tokio::runtime::Handle,
    action: Arc<dyn ClickAction>,
    error_tx: mpsc::UnboundedSender<ActionError>,
}

impl ActionDispatcher {
    /// Create a dispatcher running actions on `handle`.
    ///
    /// Returns the dispatcher plus the receiving end of the error channel.
    /// Callers drain it with `try_recv` (non-blocking); dropping it is
    /// fine — errors are still logged inside the task.
    pub fn new(
        handle: tokio::runtime::Handle,
        action: Arc<dyn ClickAction>,
    ) -> (Self, mpsc::UnboundedReceiver<ActionError>) {
        let (error_tx, error_rx) = mpsc::unbounded_channel();
        (
            Self {
                handle,
                action,
                error_tx,
            },
            error_rx,
        )
    }

    /// Hand off one trigger.  Returns immediately; the click runs on the
    /// blocking thread pool with its own error containment.
    pub fn dispatch(&self, event: TriggerEvent) {
        let action = Arc::clone(&self.action);
        let error_tx = self.error_tx.clone();

        self.handle.spawn_blocking(move || match action.click() {
            Ok(()) => {
                log::info!("CLICK! (volume: {:.4})", event.volume);
            }
            Err(e) => {
                log::warn!("click action failed: {e}");
                // Receiver may have been dropped; the log line above is
                // the fallback report.
                let _ = error_tx.send(e);
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
