//! Pitch shifting
//!
//! A note's period says how fast the sample should be played back. Rather than
//! stepping through the sample at a fractional rate while rendering, the whole
//! waveform is resampled once to the target pitch at the output rate, and frames
//! are then cut from the result.
//!
//! `scale = period / (PRIMARY_PERIOD * RECORD_RATE / playback_rate * HALF_TONE^finetune)`
//!
//! The output holds `round(len * scale)` samples. At period [`PRIMARY_PERIOD`],
//! zero finetune and `playback_rate == RECORD_RATE` the waveform is unchanged.

use crate::config::Interpolation;
use crate::song::{LoopRegion, Sample};

/// Period at which a sample plays at its recorded pitch
pub const PRIMARY_PERIOD: u16 = 214;

/// Rate (Hz) samples were recorded at when played at [`PRIMARY_PERIOD`]
pub const RECORD_RATE: u32 = 16_574;

/// Frequency ratio of one semitone, 2^(1/12)
pub const HALF_TONE: f64 = 1.059_463_094_359_295_3;

/// Pitch multiplier for a signed finetune value.
pub fn finetune_factor(finetune: i8) -> f64 {
    HALF_TONE.powi(i32::from(finetune))
}

/// Output-length multiplier for playing a sample at `period`.
pub fn scale_factor(period: u16, finetune: i8, playback_rate: u32) -> f64 {
    let base = f64::from(PRIMARY_PERIOD) * f64::from(RECORD_RATE) / f64::from(playback_rate);
    f64::from(period) / (base * finetune_factor(finetune))
}

#[inline]
fn cubic_interpolate(y0: f32, y1: f32, y2: f32, y3: f32, t: f32) -> f32 {
    let a0 = y3 - y2 - y0 + y1;
    let a1 = y0 - y1 - a0;
    let a2 = y2 - y0;
    let a3 = y1;
    a0 * t * t * t + a1 * t * t + a2 * t + a3
}

/// Stretch `data` by `ratio` (output length = `round(len * ratio)`).
pub fn resample(data: &[f32], ratio: f64, mode: Interpolation) -> Vec<f32> {
    if data.is_empty() || !ratio.is_finite() || ratio <= 0.0 {
        return Vec::new();
    }

    let out_len = (data.len() as f64 * ratio).round() as usize;
    if out_len == data.len() {
        return data.to_vec();
    }
    if out_len == 0 {
        return Vec::new();
    }

    let last = data.len() - 1;
    let at = |idx: usize| data[idx.min(last)];
    let step = data.len() as f64 / out_len as f64;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = (pos as usize).min(last);
            let t = (pos - idx as f64) as f32;
            match mode {
                Interpolation::ZeroOrderHold => data[idx],
                Interpolation::Linear => {
                    let a = data[idx];
                    a + (at(idx + 1) - a) * t
                }
                Interpolation::Cubic => cubic_interpolate(
                    at(idx.saturating_sub(1)),
                    data[idx],
                    at(idx + 1),
                    at(idx + 2),
                    t,
                ),
            }
        })
        .collect()
}

/// A sample's waveform after pitch shifting, with its loop rescaled to match.
#[derive(Debug, Clone, PartialEq)]
pub struct Transposed {
    data: Vec<f32>,
    loop_region: Option<LoopRegion>,
}

impl Transposed {
    /// Resample `sample` for playback at `period`.
    pub fn new(sample: &Sample, period: u16, playback_rate: u32, mode: Interpolation) -> Self {
        let ratio = scale_factor(period, sample.signed_finetune(), playback_rate);
        let data = resample(sample.data(), ratio, mode);

        let length_ratio = if sample.is_empty() {
            0.0
        } else {
            data.len() as f64 / sample.length() as f64
        };
        let loop_region = sample
            .loop_region()
            .and_then(|region| rescale_loop(region, length_ratio, data.len()));

        Transposed { data, loop_region }
    }

    /// Resampled waveform
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Loop in resampled frames
    pub fn loop_region(&self) -> Option<LoopRegion> {
        self.loop_region
    }

    /// Length in resampled frames
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if resampling left nothing to play
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Scale a loop by the resampling length ratio, keeping it inside `len`.
fn rescale_loop(region: LoopRegion, ratio: f64, len: usize) -> Option<LoopRegion> {
    let start = ((region.start as f64 * ratio).round() as usize).min(len);
    let length = ((region.length as f64 * ratio).round() as usize).min(len - start);
    (length > 0).then_some(LoopRegion { start, length })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp(len: usize) -> Vec<f32> {
        (0..len).map(|i| i as f32 / len as f32).collect()
    }

    #[test]
    fn test_identity_at_primary_pitch() {
        assert_relative_eq!(scale_factor(PRIMARY_PERIOD, 0, RECORD_RATE), 1.0);
        let data = ramp(100);
        for mode in [
            Interpolation::ZeroOrderHold,
            Interpolation::Linear,
            Interpolation::Cubic,
        ] {
            assert_eq!(resample(&data, 1.0, mode), data);
        }
    }

    #[test]
    fn test_octave_period_doubles_length() {
        // doubling the period halves the pitch
        assert_relative_eq!(scale_factor(428, 0, RECORD_RATE), 2.0);
        let out = resample(&ramp(50), 2.0, Interpolation::Linear);
        assert_eq!(out.len(), 100);
        assert_relative_eq!(out[1], (out[0] + out[2]) / 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_output_rate_scales_length() {
        assert_relative_eq!(
            scale_factor(PRIMARY_PERIOD, 0, 2 * RECORD_RATE),
            2.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_finetune_shifts_by_semitones() {
        assert_relative_eq!(finetune_factor(0), 1.0);
        assert_relative_eq!(finetune_factor(12), 2.0, epsilon = 1e-12);
        assert_relative_eq!(finetune_factor(-8) * finetune_factor(8), 1.0, epsilon = 1e-12);
        // positive finetune raises pitch, so the output gets shorter
        assert!(scale_factor(PRIMARY_PERIOD, 1, RECORD_RATE) < 1.0);
    }

    #[test]
    fn test_zero_order_hold_repeats() {
        let out = resample(&[0.25, -0.5], 2.0, Interpolation::ZeroOrderHold);
        assert_eq!(out, vec![0.25, 0.25, -0.5, -0.5]);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(resample(&[], 2.0, Interpolation::Linear).is_empty());
        assert!(resample(&[1.0], 0.0, Interpolation::Linear).is_empty());
        assert!(resample(&[1.0, 1.0], 0.1, Interpolation::Cubic).is_empty());
        assert!(resample(&[1.0], f64::NAN, Interpolation::Cubic).is_empty());
    }

    #[test]
    fn test_transpose_rescales_loop() {
        let sample = Sample::new("", 0, 64, 10, 20, ramp(40));
        let transposed = Transposed::new(&sample, 428, RECORD_RATE, Interpolation::Linear);
        assert_eq!(transposed.len(), 80);
        assert_eq!(
            transposed.loop_region(),
            Some(LoopRegion {
                start: 20,
                length: 40
            })
        );
    }

    #[test]
    fn test_transpose_identity_keeps_data() {
        let sample = Sample::new("", 0, 64, 0, 0, ramp(16));
        let transposed =
            Transposed::new(&sample, PRIMARY_PERIOD, RECORD_RATE, Interpolation::Cubic);
        assert_eq!(transposed.data(), sample.data());
        assert_eq!(transposed.loop_region(), None);
    }

    #[test]
    fn test_transpose_period_zero_is_empty() {
        let sample = Sample::new("", 0, 64, 0, 8, ramp(16));
        let transposed = Transposed::new(&sample, 0, RECORD_RATE, Interpolation::Linear);
        assert!(transposed.is_empty());
        assert_eq!(transposed.loop_region(), None);
    }
}
