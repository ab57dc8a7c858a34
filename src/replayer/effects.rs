//! Effect transforms
//!
//! Each rendered frame passes through an [`EffectTransform`] together with the
//! channel's active [`Effect`]. Transforms are stateless: the same effect and
//! input frame always give the same output.

use crate::song::Effect;

/// Full volume for the `Cxx` command
pub const MAX_VOLUME: u8 = 64;

/// A per-frame audio transform driven by the active effect.
pub trait EffectTransform: Send + Sync {
    /// Rewrite `frame` in place for `effect`.
    fn apply(&self, effect: &Effect, frame: &mut [f32]);

    /// Short name for logs
    fn name(&self) -> &str;
}

/// Leaves every frame untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl EffectTransform for Passthrough {
    fn apply(&self, _effect: &Effect, _frame: &mut [f32]) {}

    fn name(&self) -> &str {
        "passthrough"
    }
}

/// Applies `Cxx` (set volume) as a gain of `xx / 64`. Other effects pass through.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeTransform;

impl EffectTransform for VolumeTransform {
    fn apply(&self, effect: &Effect, frame: &mut [f32]) {
        if let Effect::SetVolume(volume) = *effect {
            let gain = f32::from(volume.min(MAX_VOLUME)) / f32::from(MAX_VOLUME);
            frame.iter_mut().for_each(|s| *s *= gain);
        }
    }

    fn name(&self) -> &str {
        "volume"
    }
}
