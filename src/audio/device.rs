//! Input-device enumeration and instrument auto-suggestion.
//!
//! The front-end prints the device list and offers the first device whose
//! name looks like an instrument cable.  The suggestion is a convenience
//! heuristic only — the detector itself works with whatever device index
//! the config carries.

use cpal::traits::{DeviceTrait, HostTrait};

use super::capture::StreamError;

// ---------------------------------------------------------------------------
// InputDeviceInfo
// ---------------------------------------------------------------------------

/// One entry of the input-device listing.
#[derive(Debug, Clone)]
pub struct InputDeviceInfo {
    /// Position in the host's input-device iterator; pass this as
    /// `DetectorConfig::device`.
    pub index: usize,
    /// Human-readable device name as reported by the backend.
    pub name: String,
    /// Channel count of the device's default input configuration.
    pub max_input_channels: u16,
    /// Sample rate of the device's default input configuration, in Hz.
    pub default_sample_rate: u32,
}

// ---------------------------------------------------------------------------
// Enumeration
// ---------------------------------------------------------------------------

/// List every input device on the default host.
///
/// Devices that fail to report a default input configuration are skipped
/// (logged at debug level) but keep their index so that selection by
/// number remains stable.
pub fn list_input_devices() -> Result<Vec<InputDeviceInfo>, StreamError> {
    let host = cpal::default_host();
    let mut out = Vec::new();

    for (index, device) in host.input_devices()?.enumerate() {
        let name = device.name().unwrap_or_else(|_| "<unknown>".into());
        match device.default_input_config() {
            Ok(cfg) => out.push(InputDeviceInfo {
                index,
                name,
                max_input_channels: cfg.channels(),
                default_sample_rate: cfg.sample_rate().0,
            }),
            Err(e) => {
                log::debug!("skipping input device {index} ({name}): {e}");
            }
        }
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// Auto-suggestion heuristic
// ---------------------------------------------------------------------------

/// Name fragments that commonly identify an instrument cable or line-in.
pub const INSTRUMENT_KEYWORDS: [&str; 7] = [
    "rocksmith", "usb", "guitar", "line", "real", "tone", "cable",
];

/// Suggest the first device whose name contains an instrument keyword
/// (case-insensitive substring match).  Returns `None` when nothing looks
/// like an instrument input.
pub fn suggest_instrument_device(devices: &[InputDeviceInfo]) -> Option<&InputDeviceInfo> {
    devices.iter().find(|d| {
        let lower = d.name.to_lowercase();
        INSTRUMENT_KEYWORDS.iter().any(|kw| lower.contains(kw))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn info(index: usize, name: &str) -> InputDeviceInfo {
        InputDeviceInfo {
            index,
            name: name.into(),
            max_input_channels: 2,
            default_sample_rate: 48_000,
        }
    }

    #[test]
    fn suggests_first_keyword_match() {
        let devices = vec![
            info(0, "Built-in Microphone"),
            info(1, "Rocksmith USB Guitar Adapter"),
            info(2, "Line In (Realtek)"),
        ];
        let suggested = suggest_instrument_device(&devices).unwrap();
        assert_eq!(suggested.index, 1);
    }

    #[test]
    fn match_is_case_insensitive() {
        let devices = vec![info(0, "VIRTUAL CABLE OUTPUT")];
        assert!(suggest_instrument_device(&devices).is_some());
    }

    #[test]
    fn no_match_returns_none() {
        let devices = vec![info(0, "Built-in Microphone"), info(1, "Webcam Audio")];
        assert!(suggest_instrument_device(&devices).is_none());
    }

    #[test]
    fn empty_list_returns_none() {
        assert!(suggest_instrument_device(&[]).is_none());
    }
}
