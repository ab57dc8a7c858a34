//! Channel renderer
//!
//! Turns the note under the cursor into one frame of audio for a single channel:
//! update the channel state, pitch-shift the active sample, cut out the current
//! frame, apply the effect.

use std::sync::Arc;

use super::channel_state::ChannelState;
use super::cursor::BeatCursor;
use super::effects::{EffectTransform, Passthrough};
use super::resample::Transposed;
use super::window::fill_window;
use crate::config::{Interpolation, TimingConfig};
use crate::error::IndexError;
use crate::song::{Note, Song};

/// Renders one channel, tick by tick.
pub struct ChannelRenderer {
    channel_no: usize,
    state: ChannelState,
    frame_size: usize,
    playback_rate: u32,
    interpolation: Interpolation,
    /// Last transposed waveform, keyed by (sample, period)
    cache: Option<((usize, u16), Transposed)>,
    effects: Arc<dyn EffectTransform>,
}

impl ChannelRenderer {
    /// Create a renderer for `channel_no` with the identity effect transform.
    pub fn new(channel_no: usize, timing: &TimingConfig, interpolation: Interpolation) -> Self {
        ChannelRenderer {
            channel_no,
            state: ChannelState::new(),
            frame_size: timing.frame_size,
            playback_rate: timing.playback_rate,
            interpolation,
            cache: None,
            effects: Arc::new(Passthrough),
        }
    }

    /// Replace the effect transform.
    pub fn with_effects(mut self, effects: Arc<dyn EffectTransform>) -> Self {
        self.effects = effects;
        self
    }

    /// Channel this renderer plays
    pub fn channel_no(&self) -> usize {
        self.channel_no
    }

    /// Output samples per tick
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Current channel state
    pub fn state(&self) -> &ChannelState {
        &self.state
    }

    /// Forget the active note and cached waveform.
    pub fn reset(&mut self) {
        self.state.reset();
        self.cache = None;
    }

    /// Render the tick at `cursor` into `out`.
    ///
    /// On error `out` holds silence; the channel state is left as it was if the
    /// note itself could not be found.
    pub fn render(
        &mut self,
        song: &Song,
        cursor: BeatCursor,
        out: &mut [f32],
    ) -> Result<(), IndexError> {
        out.fill(0.0);

        let note = self.note_at(song, cursor)?;
        self.state.apply(&note);

        let Some(sample_idx) = self.state.sample() else {
            return Ok(());
        };
        let sample = song
            .samples()
            .get(sample_idx)
            .ok_or(IndexError::Sample(sample_idx))?;

        let key = (sample_idx, self.state.period());
        if self.cache.as_ref().map_or(true, |(cached, _)| *cached != key) {
            tracing::trace!(
                channel = self.channel_no,
                sample = sample_idx,
                period = key.1,
                "transposing sample"
            );
            let transposed = Transposed::new(sample, key.1, self.playback_rate, self.interpolation);
            self.cache = Some((key, transposed));
        }

        if let Some((_, transposed)) = &self.cache {
            let start = self.state.current_frame().saturating_mul(self.frame_size);
            fill_window(out, transposed.data(), transposed.loop_region(), start);
        }
        self.effects.apply(&self.state.effect(), out);
        Ok(())
    }

    /// Render the tick at `cursor` into a new buffer of `frame_size` samples.
    pub fn render_frame(&mut self, song: &Song, cursor: BeatCursor) -> (Vec<f32>, Option<IndexError>) {
        let mut out = vec![0.0; self.frame_size];
        let err = self.render(song, cursor, &mut out).err();
        (out, err)
    }

    fn note_at(&self, song: &Song, cursor: BeatCursor) -> Result<Note, IndexError> {
        let pattern_idx = *song
            .pattern_order()
            .get(cursor.pattern_idx)
            .ok_or(IndexError::Position(cursor.pattern_idx))?;
        let pattern = song
            .patterns()
            .get(pattern_idx)
            .ok_or(IndexError::Pattern(pattern_idx))?;
        pattern
            .note(self.channel_no, cursor.note_idx)
            .copied()
            .ok_or(IndexError::Row(cursor.note_idx))
    }
}

impl std::fmt::Debug for ChannelRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRenderer")
            .field("channel_no", &self.channel_no)
            .field("state", &self.state)
            .field("frame_size", &self.frame_size)
            .field("effects", &self.effects.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replayer::effects::VolumeTransform;
    use crate::replayer::resample::{PRIMARY_PERIOD, RECORD_RATE};
    use crate::song::{Effect, FormatVariant, Pattern, Sample};

    fn timing(frame_size: usize) -> TimingConfig {
        TimingConfig {
            frame_size,
            playback_rate: RECORD_RATE,
            ..TimingConfig::default()
        }
    }

    fn song_with(pattern: Pattern, samples: Vec<Sample>) -> Song {
        Song::new("t", FormatVariant::ProTracker, 1, vec![0], vec![pattern], samples).unwrap()
    }

    fn ramp(len: usize) -> Vec<f32> {
        (0..len).map(|i| i as f32 / 100.0).collect()
    }

    #[test]
    fn test_untriggered_channel_is_silent() {
        let song = song_with(Pattern::default(), vec![Sample::empty()]);
        let mut renderer = ChannelRenderer::new(0, &timing(8), Interpolation::Linear);
        let (frame, err) = renderer.render_frame(&song, BeatCursor::START);
        assert_eq!(frame, vec![0.0; 8]);
        assert!(err.is_none());
    }

    #[test]
    fn test_trigger_then_continue_walks_the_sample() {
        let mut pattern = Pattern::default();
        pattern.set_note(1, 0, Note::trigger(0, PRIMARY_PERIOD));
        let song = song_with(pattern, vec![Sample::new("", 0, 64, 0, 0, ramp(20))]);
        let mut renderer = ChannelRenderer::new(1, &timing(8), Interpolation::Linear);

        let (first, _) = renderer.render_frame(&song, BeatCursor::new(0, 0));
        assert_eq!(first, ramp(20)[..8].to_vec());
        let (second, _) = renderer.render_frame(&song, BeatCursor::new(0, 1));
        assert_eq!(second, ramp(20)[8..16].to_vec());
        let (third, _) = renderer.render_frame(&song, BeatCursor::new(0, 2));
        assert_eq!(&third[..4], &ramp(20)[16..]);
        assert_eq!(&third[4..], &[0.0; 4]);
        assert_eq!(renderer.state().current_frame(), 2);
    }

    #[test]
    fn test_missing_sample_is_silence_and_error() {
        let mut pattern = Pattern::default();
        pattern.set_note(0, 0, Note::trigger(7, PRIMARY_PERIOD));
        let song = song_with(pattern, vec![Sample::new("", 0, 64, 0, 0, ramp(20))]);
        let mut renderer = ChannelRenderer::new(0, &timing(4), Interpolation::Linear);
        let (frame, err) = renderer.render_frame(&song, BeatCursor::START);
        assert_eq!(frame, vec![0.0; 4]);
        assert_eq!(err, Some(IndexError::Sample(7)));
    }

    #[test]
    fn test_cursor_outside_song_is_error() {
        let song = song_with(Pattern::default(), vec![]);
        let mut renderer = ChannelRenderer::new(0, &timing(4), Interpolation::Linear);
        let mut out = [1.0; 4];
        assert_eq!(
            renderer.render(&song, BeatCursor::new(3, 0), &mut out),
            Err(IndexError::Position(3))
        );
        assert_eq!(out, [0.0; 4]);
        assert_eq!(
            renderer.render(&song, BeatCursor::new(0, 64), &mut out),
            Err(IndexError::Row(64))
        );
    }

    #[test]
    fn test_effect_transform_applied() {
        let mut pattern = Pattern::default();
        pattern.set_note(
            0,
            0,
            Note {
                sample: Some(0),
                period: PRIMARY_PERIOD,
                effect: Effect::SetVolume(32),
            },
        );
        let song = song_with(pattern, vec![Sample::new("", 0, 64, 0, 0, vec![0.5; 4])]);
        let mut renderer = ChannelRenderer::new(0, &timing(4), Interpolation::Linear)
            .with_effects(Arc::new(VolumeTransform));
        let (frame, _) = renderer.render_frame(&song, BeatCursor::START);
        assert_eq!(frame, vec![0.25; 4]);
    }

    #[test]
    fn test_cache_matches_fresh_render() {
        let mut pattern = Pattern::default();
        pattern.set_note(0, 0, Note::trigger(0, 300));
        pattern.set_note(0, 2, Note::trigger(0, 150));
        let song = song_with(pattern, vec![Sample::new("", 3, 64, 4, 30, ramp(40))]);
        let t = timing(16);

        let mut cached = ChannelRenderer::new(0, &t, Interpolation::Cubic);
        for row in 0..6 {
            let cursor = BeatCursor::new(0, row);
            let (frame, _) = cached.render_frame(&song, cursor);

            let mut fresh = ChannelRenderer::new(0, &t, Interpolation::Cubic);
            fresh.state = *cached.state();
            let mut expected = vec![0.0; 16];
            let transposed =
                Transposed::new(&song.samples()[0], fresh.state.period(), t.playback_rate, Interpolation::Cubic);
            fill_window(
                &mut expected,
                transposed.data(),
                transposed.loop_region(),
                fresh.state.current_frame() * 16,
            );
            assert_eq!(frame, expected, "row {row}");
        }
    }
}
