//! Single-threaded player
//!
//! Renders and mixes ticks in the caller's thread using the same channel renderer
//! and mix step as the threaded pipeline. Output is identical tick for tick.

use std::sync::Arc;

use super::cursor::BeatCursor;
use super::effects::EffectTransform;
use super::mixer::mix_into;
use super::renderer::ChannelRenderer;
use crate::config::{PlayerConfig, TimingConfig};
use crate::error::Result;
use crate::song::Song;

/// Plays a song one tick at a time without threads.
#[derive(Debug)]
pub struct SongPlayer {
    song: Arc<Song>,
    timing: TimingConfig,
    renderers: Vec<ChannelRenderer>,
    frames: Vec<Vec<f32>>,
    cursor: BeatCursor,
    ticks: u64,
    index_errors: u64,
}

impl SongPlayer {
    /// Create a player for `song`. Fails if the config does not fit the song.
    pub fn new(song: Arc<Song>, config: &PlayerConfig) -> Result<Self> {
        config.validate_for(&song)?;
        let timing = config.timing()?;
        let renderers: Vec<ChannelRenderer> = config
            .active_channels()?
            .into_iter()
            .map(|ch| ChannelRenderer::new(ch, &timing, config.interpolation))
            .collect();
        let frames = vec![vec![0.0; timing.frame_size]; renderers.len()];

        Ok(SongPlayer {
            cursor: BeatCursor::new(config.start_pattern, config.start_note),
            song,
            timing,
            renderers,
            frames,
            ticks: 0,
            index_errors: 0,
        })
    }

    /// Use `effects` on every channel.
    pub fn with_effects(mut self, effects: Arc<dyn EffectTransform>) -> Self {
        self.renderers = self
            .renderers
            .into_iter()
            .map(|r| r.with_effects(effects.clone()))
            .collect();
        self
    }

    /// Render, mix and advance one tick.
    pub fn generate_tick(&mut self) -> Vec<f32> {
        let mut out = vec![0.0; self.timing.frame_size];
        self.generate_tick_into(&mut out);
        out
    }

    /// Like [`SongPlayer::generate_tick`], writing into `out`.
    pub fn generate_tick_into(&mut self, out: &mut [f32]) {
        for (renderer, frame) in self.renderers.iter_mut().zip(self.frames.iter_mut()) {
            if let Err(e) = renderer.render(&self.song, self.cursor, frame) {
                self.index_errors += 1;
                tracing::warn!(channel = renderer.channel_no(), error = %e, "channel silent for this tick");
            }
        }
        mix_into(&self.frames, out);
        self.cursor.advance(self.song.play_bound());
        self.ticks += 1;
    }

    /// Render `ticks` ticks back to back.
    pub fn render_ticks(&mut self, ticks: usize) -> Vec<f32> {
        let frame_size = self.timing.frame_size;
        let mut out = vec![0.0; ticks * frame_size];
        for chunk in out.chunks_exact_mut(frame_size) {
            self.generate_tick_into(chunk);
        }
        out
    }

    /// Position of the next tick
    pub fn cursor(&self) -> BeatCursor {
        self.cursor
    }

    /// Per-channel frames from the last tick, in channel order
    pub fn channel_frames(&self) -> &[Vec<f32>] {
        &self.frames
    }

    /// Output samples per tick
    pub fn frame_size(&self) -> usize {
        self.timing.frame_size
    }

    /// Tick timing
    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Ticks rendered so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Channel renders that hit a missing pattern, row or sample
    pub fn index_errors(&self) -> u64 {
        self.index_errors
    }

    /// The song being played
    pub fn song(&self) -> &Song {
        &self.song
    }
}
