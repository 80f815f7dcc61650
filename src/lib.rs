//! strum-click — turn an instrument's audio signal into mouse clicks.
//!
//! Continuously samples an audio input device, computes an RMS loudness
//! estimate per delivered block, and fires a synthetic pointer click when
//! loudness crosses a threshold, subject to a minimum re-trigger interval.
//!
//! # Pipeline
//!
//! ```text
//! Instrument → cpal callback → block_rms → OnsetDebouncer
//!            → TriggerEvent → ActionDispatcher → enigo click
//! ```
//!
//! The per-block work (RMS + debounce decision) runs synchronously inside
//! the audio callback and is bounded; the click itself is handed off to a
//! tokio blocking task so the callback never waits on it.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use strum_click::click::MouseClicker;
//! use strum_click::config::DetectorConfig;
//! use strum_click::audio::CpalBackend;
//! use strum_click::detector::OnsetDetector;
//! use strum_click::dispatch::ActionDispatcher;
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! let (dispatcher, _errors) =
//!     ActionDispatcher::new(rt.handle().clone(), Arc::new(MouseClicker::new()));
//!
//! let detector = OnsetDetector::new(dispatcher);
//! detector.start(DetectorConfig::default(), CpalBackend::new()).unwrap();
//! // ... strum away ...
//! detector.stop();
//! ```

pub mod audio;
pub mod click;
pub mod config;
pub mod detector;
pub mod dispatch;
