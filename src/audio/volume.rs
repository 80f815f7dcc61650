//! Block loudness estimation.
//!
//! [`block_rms`] reduces one callback block to a single scalar: the
//! root-mean-square of the first channel.  The channel choice is
//! deterministic — on a multi-channel device the left/first channel is
//! what an instrument cable feeds — and documented rather than configurable.

// ---------------------------------------------------------------------------
// block_rms
// ---------------------------------------------------------------------------

/// RMS loudness of one interleaved audio block.
///
/// Selects the first channel of `samples` (stride `channels`) and returns
/// `sqrt(mean(x_i^2))`.  A zero-length block — a degenerate backend
/// condition — returns `0.0` exactly.  The result is never negative and is
/// not clamped above: samples outside the normalized `[-1.0, 1.0]` range
/// can push it past `1.0`, which is left visible rather than hidden.
///
/// # Example
///
/// ```rust
/// use strum_click::audio::block_rms;
///
/// assert_eq!(block_rms(&[0.0; 1024], 1), 0.0);
/// let v = block_rms(&[0.5; 1024], 1);
/// assert!((v - 0.5).abs() < 1e-6);
/// ```
pub fn block_rms(samples: &[f32], channels: u16) -> f32 {
    let stride = channels.max(1) as usize;
    let mut sum_sq = 0.0_f64;
    let mut count = 0_usize;

    for &s in samples.iter().step_by(stride) {
        sum_sq += f64::from(s) * f64::from(s);
        count += 1;
    }

    if count == 0 {
        return 0.0;
    }
    (sum_sq / count as f64).sqrt() as f32
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
