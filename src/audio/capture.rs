//! Instrument capture via `cpal`.
//!
//! [`CaptureBackend`] is the seam between the detector and the audio
//! hardware: implementations open an input stream for a
//! [`DetectorConfig`] and invoke `on_block` once per delivered buffer.
//! The returned [`StreamGuard`] is a RAII guard — dropping it closes the
//! underlying stream.  [`CpalBackend`] is the production implementation;
//! tests substitute a fake that feeds synthetic blocks.
//!
//! cpal streams are not `Send` on every platform, so a guard must be
//! created and dropped on the same thread.  The detector honours this by
//! calling [`CaptureBackend::open`] from its worker thread.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc;
use thiserror::Error;

use crate::config::DetectorConfig;

// ---------------------------------------------------------------------------
// StreamError
// ---------------------------------------------------------------------------

/// Errors that can occur while opening or maintaining the audio stream.
///
/// A `StreamError` terminates the run it occurred in; it is reported to
/// the front-end and never auto-retried.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("input device index {0} does not exist")]
    InvalidDevice(usize),

    #[error("failed to enumerate input devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    /// The stream failed after it was opened (device unplugged, backend
    /// overrun, permission revoked).  Carries the backend's description.
    #[error("audio stream failed at runtime: {0}")]
    Runtime(String),
}

// ---------------------------------------------------------------------------
// CaptureBackend
// ---------------------------------------------------------------------------

/// Per-block callback: interleaved `f32` samples plus the channel count
/// they were delivered with.  Invoked sequentially — the backend never
/// delivers two blocks concurrently.
pub type BlockFn = Box<dyn FnMut(&[f32], u16) + Send + 'static>;

/// RAII handle for an open stream.  Dropping it releases the stream.
pub trait StreamGuard {}

/// Audio capture backend abstraction.
pub trait CaptureBackend: Send + 'static {
    /// Open an input stream for `config`.
    ///
    /// `on_block` runs on the backend's callback context once per buffer.
    /// Runtime failures after a successful open are reported through
    /// `fault_tx`; the implementation must not panic on them.
    fn open(
        &mut self,
        config: &DetectorConfig,
        on_block: BlockFn,
        fault_tx: mpsc::Sender<StreamError>,
    ) -> Result<Box<dyn StreamGuard>, StreamError>;
}

// ---------------------------------------------------------------------------
// CpalBackend
// ---------------------------------------------------------------------------

/// Production capture backend built on the default cpal host.
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

struct CpalStreamGuard {
    _stream: cpal::Stream,
}

impl StreamGuard for CpalStreamGuard {}

impl CaptureBackend for CpalBackend {
    fn open(
        &mut self,
        config: &DetectorConfig,
        mut on_block: BlockFn,
        fault_tx: mpsc::Sender<StreamError>,
    ) -> Result<Box<dyn StreamGuard>, StreamError> {
        let host = cpal::default_host();

        let device = match config.device {
            Some(index) => host
                .input_devices()?
                .nth(index)
                .ok_or(StreamError::InvalidDevice(index))?,
            None => host.default_input_device().ok_or(StreamError::NoDevice)?,
        };

        let supported = device.default_input_config()?;
        let channels = supported.channels();

        // Follow the device's preferred rate when it disagrees with the
        // requested one — forcing an unsupported rate fails on most hosts.
        let device_rate = supported.sample_rate().0;
        let sample_rate = if device_rate != config.sample_rate {
            log::info!(
                "adjusting sample rate from {} to device-preferred {}",
                config.sample_rate,
                device_rate
            );
            device_rate
        } else {
            config.sample_rate
        };

        let stream_config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Fixed(config.block_size),
        };

        log::info!(
            "opening input stream: {} ch, {} Hz, {}-sample blocks",
            channels,
            sample_rate,
            config.block_size
        );

        let stream = device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                on_block(data, channels);
            },
            move |err: cpal::StreamError| {
                log::error!("cpal stream error: {err}");
                // Ignore send errors; the worker may already be shutting down.
                let _ = fault_tx.send(StreamError::Runtime(err.to_string()));
            },
            None, // no timeout
        )?;

        stream.play()?;
        Ok(Box::new(CpalStreamGuard { _stream: stream }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// `StreamError` crosses the fault channel between threads.
    #[test]
    fn stream_error_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<StreamError>();
    }

    #[test]
    fn runtime_error_carries_description() {
        let err = StreamError::Runtime("device unplugged".into());
        assert!(err.to_string().contains("device unplugged"));
    }
}
