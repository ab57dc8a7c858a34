//! Player configuration
//!
//! [`PlayerConfig`] is what the CLI (or a JSON file) hands to the replayer. Tempo
//! settings collapse into a [`TimingConfig`], which fixes how many output samples
//! one tick covers.

use std::fs;
use std::path::Path;
use std::time::Duration;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::{ModError, Result};
use crate::song::{Song, CHANNEL_COUNT, ROWS_PER_PATTERN};

/// Default tempo in beats per minute
pub const DEFAULT_BPM: u32 = 125;
/// Default ticks per beat
pub const DEFAULT_TICKS_PER_BEAT: u32 = 4;
/// Default output sample rate in Hz
pub const DEFAULT_PLAYBACK_RATE: u32 = 48_000;

bitflags! {
    /// Active channel set
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChannelMask: u8 {
        /// Channel 0
        const CH_0 = 0x01;
        /// Channel 1
        const CH_1 = 0x02;
        /// Channel 2
        const CH_2 = 0x04;
        /// Channel 3
        const CH_3 = 0x08;
    }
}

impl ChannelMask {
    /// Build a mask from channel numbers. Numbers past the last channel are rejected.
    pub fn from_channels(channels: &[usize]) -> Result<Self> {
        channels.iter().try_fold(ChannelMask::empty(), |mask, &ch| {
            if ch >= CHANNEL_COUNT {
                return Err(ModError::ConfigError(format!(
                    "channel {} out of range (0-{})",
                    ch,
                    CHANNEL_COUNT - 1
                )));
            }
            Ok(mask | ChannelMask::from_bits_truncate(1 << ch))
        })
    }

    /// Channel numbers in ascending order
    pub fn channels(&self) -> Vec<usize> {
        (0..CHANNEL_COUNT)
            .filter(|&ch| self.bits() & (1 << ch) != 0)
            .collect()
    }

    /// Check if a channel is enabled
    pub fn is_enabled(&self, channel: usize) -> bool {
        channel < CHANNEL_COUNT && self.bits() & (1 << channel) != 0
    }
}

/// Resampling quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Nearest preceding sample
    ZeroOrderHold,
    /// Straight line between neighbours
    #[default]
    Linear,
    /// Cubic through four neighbours
    Cubic,
}

impl std::str::FromStr for Interpolation {
    type Err = ModError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().replace('-', "_").as_str() {
            "zero_order_hold" | "zoh" | "none" => Ok(Interpolation::ZeroOrderHold),
            "linear" => Ok(Interpolation::Linear),
            "cubic" => Ok(Interpolation::Cubic),
            other => Err(ModError::ConfigError(format!(
                "unknown interpolation '{}' (expected zero_order_hold, linear or cubic)",
                other
            ))),
        }
    }
}

/// Tempo settings reduced to per-tick sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingConfig {
    /// Beats per minute
    pub bpm: u32,
    /// Ticks per beat
    pub ticks_per_beat: u32,
    /// Output sample rate in Hz
    pub playback_rate: u32,
    /// Seconds per tick: `60 / (bpm * ticks_per_beat)`
    pub tick_seconds: f64,
    /// Output samples per tick
    pub frame_size: usize,
}

impl TimingConfig {
    /// Derive tick timing. Fails if any input is zero or the frame would be empty.
    pub fn new(bpm: u32, ticks_per_beat: u32, playback_rate: u32) -> Result<Self> {
        if bpm == 0 || ticks_per_beat == 0 || playback_rate == 0 {
            return Err(ModError::ConfigError(format!(
                "bpm ({}), ticks per beat ({}) and playback rate ({}) must be positive",
                bpm, ticks_per_beat, playback_rate
            )));
        }

        let tick_seconds = 60.0 / (f64::from(bpm) * f64::from(ticks_per_beat));
        let frame_size = (tick_seconds * f64::from(playback_rate)).round() as usize;
        if frame_size == 0 {
            return Err(ModError::ConfigError(format!(
                "tempo {} bpm x {} ticks is too fast for {} Hz: a tick covers no samples",
                bpm, ticks_per_beat, playback_rate
            )));
        }

        Ok(TimingConfig {
            bpm,
            ticks_per_beat,
            playback_rate,
            tick_seconds,
            frame_size,
        })
    }

    /// Wall-clock length of one tick
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(self.tick_seconds)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        let tick_seconds =
            60.0 / (f64::from(DEFAULT_BPM) * f64::from(DEFAULT_TICKS_PER_BEAT));
        TimingConfig {
            bpm: DEFAULT_BPM,
            ticks_per_beat: DEFAULT_TICKS_PER_BEAT,
            playback_rate: DEFAULT_PLAYBACK_RATE,
            tick_seconds,
            frame_size: (tick_seconds * f64::from(DEFAULT_PLAYBACK_RATE)).round() as usize,
        }
    }
}

/// Everything the replayer needs besides the song itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Channels to render (subset of 0-3)
    pub channels: Vec<usize>,
    /// Beats per minute
    pub bpm: u32,
    /// Ticks per beat
    pub ticks_per_beat: u32,
    /// Output sample rate in Hz
    pub playback_rate: u32,
    /// Resampling quality
    pub interpolation: Interpolation,
    /// Play position to start from
    pub start_pattern: usize,
    /// Row to start from
    pub start_note: usize,
    /// Mixed frames the sink hand-off can hold
    pub sink_queue_len: usize,
    /// How long the mixer waits for a full sink before dropping a frame
    pub sink_timeout_ms: u64,
    /// Monitor refresh interval
    pub monitor_refresh_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            channels: (0..CHANNEL_COUNT).collect(),
            bpm: DEFAULT_BPM,
            ticks_per_beat: DEFAULT_TICKS_PER_BEAT,
            playback_rate: DEFAULT_PLAYBACK_RATE,
            interpolation: Interpolation::default(),
            start_pattern: 0,
            start_note: 0,
            sink_queue_len: 2,
            sink_timeout_ms: 1000,
            monitor_refresh_ms: 50,
        }
    }
}

impl PlayerConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PlayerConfig = serde_json::from_str(json)
            .map_err(|e| ModError::ConfigError(format!("invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            ModError::ConfigError(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    /// Check everything that does not depend on the song.
    pub fn validate(&self) -> Result<()> {
        if self.channels.is_empty() {
            return Err(ModError::ConfigError("no channels selected".to_string()));
        }
        ChannelMask::from_channels(&self.channels)?;
        self.timing()?;
        if self.sink_queue_len == 0 {
            return Err(ModError::ConfigError(
                "sink_queue_len must be at least 1".to_string(),
            ));
        }
        if self.start_note >= ROWS_PER_PATTERN {
            return Err(ModError::ConfigError(format!(
                "start_note {} out of range (0-{})",
                self.start_note,
                ROWS_PER_PATTERN - 1
            )));
        }
        Ok(())
    }

    /// Check the start position against a decoded song.
    pub fn validate_for(&self, song: &Song) -> Result<()> {
        self.validate()?;
        if self.start_pattern >= song.play_bound() {
            return Err(ModError::ConfigError(format!(
                "start_pattern {} out of range (song plays positions 0-{})",
                self.start_pattern,
                song.play_bound() - 1
            )));
        }
        Ok(())
    }

    /// Selected channels as a mask
    pub fn channel_mask(&self) -> Result<ChannelMask> {
        ChannelMask::from_channels(&self.channels)
    }

    /// Selected channels, sorted and without duplicates
    pub fn active_channels(&self) -> Result<Vec<usize>> {
        Ok(self.channel_mask()?.channels())
    }

    /// Derived tick timing
    pub fn timing(&self) -> Result<TimingConfig> {
        TimingConfig::new(self.bpm, self.ticks_per_beat, self.playback_rate)
    }

    /// Sink hand-off timeout
    pub fn sink_timeout(&self) -> Duration {
        Duration::from_millis(self.sink_timeout_ms)
    }

    /// Monitor refresh interval
    pub fn monitor_refresh(&self) -> Duration {
        Duration::from_millis(self.monitor_refresh_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::{FormatVariant, Pattern};

    #[test]
    fn test_default_frame_size() {
        let timing = PlayerConfig::default().timing().unwrap();
        assert_eq!(timing.frame_size, 5760);
        assert_eq!(timing, TimingConfig::default());
        approx::assert_relative_eq!(timing.tick_duration().as_secs_f64(), 0.12, epsilon = 1e-6);
    }

    #[test]
    fn test_frame_size_rounds() {
        // 60 / (125 * 6) * 44100 = 3528
        assert_eq!(TimingConfig::new(125, 6, 44_100).unwrap().frame_size, 3528);
        // 60 / (97 * 4) * 22050 = 3409.79...
        assert_eq!(TimingConfig::new(97, 4, 22_050).unwrap().frame_size, 3410);
    }

    #[test]
    fn test_zero_tempo_rejected() {
        assert!(matches!(
            TimingConfig::new(0, 4, 48_000),
            Err(ModError::ConfigError(_))
        ));
        assert!(TimingConfig::new(125, 4, 0).is_err());
        assert!(TimingConfig::new(u32::MAX, u32::MAX, 1).is_err());
    }

    #[test]
    fn test_channel_mask() {
        let mask = ChannelMask::from_channels(&[3, 0, 3]).unwrap();
        assert_eq!(mask, ChannelMask::CH_0 | ChannelMask::CH_3);
        assert_eq!(mask.channels(), vec![0, 3]);
        assert!(mask.is_enabled(3));
        assert!(!mask.is_enabled(1));
        assert!(!mask.is_enabled(7));
        assert!(ChannelMask::from_channels(&[4]).is_err());
    }

    #[test]
    fn test_json_partial_override() {
        let config =
            PlayerConfig::from_json_str(r#"{"channels":[1,2],"interpolation":"cubic"}"#).unwrap();
        assert_eq!(config.channels, vec![1, 2]);
        assert_eq!(config.interpolation, Interpolation::Cubic);
        assert_eq!(config.bpm, DEFAULT_BPM);
        assert_eq!(config.sink_queue_len, 2);
    }

    #[test]
    fn test_json_invalid() {
        assert!(PlayerConfig::from_json_str(r#"{"channels":[]}"#).is_err());
        assert!(PlayerConfig::from_json_str(r#"{"interpolation":"sinc"}"#).is_err());
        assert!(PlayerConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_interpolation_from_str() {
        assert_eq!(
            "zero-order-hold".parse::<Interpolation>().unwrap(),
            Interpolation::ZeroOrderHold
        );
        assert_eq!("LINEAR".parse::<Interpolation>().unwrap(), Interpolation::Linear);
        assert!("sinc".parse::<Interpolation>().is_err());
    }

    #[test]
    fn test_start_position_checked_against_song() {
        let song = Song::new(
            "",
            FormatVariant::ProTracker,
            0,
            vec![0, 0],
            vec![Pattern::default()],
            vec![],
        )
        .unwrap();

        let mut config = PlayerConfig {
            start_pattern: 1,
            start_note: 63,
            ..PlayerConfig::default()
        };
        assert!(config.validate_for(&song).is_ok());

        config.start_pattern = 2;
        assert!(config.validate_for(&song).is_err());

        config.start_pattern = 0;
        config.start_note = 64;
        assert!(config.validate().is_err());
    }
}
