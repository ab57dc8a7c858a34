//! 4-channel tracker module player
//!
//! Decodes classic 4-channel, 31-sample tracker modules (`M.K.` and friends) into
//! an immutable [`Song`] and renders it tick by tick: one worker thread per
//! channel, all of them held in lock-step by a barrier whose last arrival mixes
//! the channel frames, hands the result to the audio sink and advances the
//! shared beat cursor.
//!
//! # Features
//! - Bit-exact decoding of the module layout, including packed note cells
//! - Per-channel note state, pitch-shifting resampler and loop-aware windowing
//! - Barrier-synchronized render → mix → advance cycle with cooperative shutdown
//! - Bounded sink hand-off that drops frames instead of stalling the renderers
//! - Transparent LHA decompression of packed modules
//!
//! # Crate feature flags
//! - `mod-format` (default): module decoding and loading (`mod_parser`, `mod_loader`, `compression`)
//! - `replayer` (default): render pipeline (`replayer`)
//! - `visualization` (default): read-only channel monitor and level bars (`visualization`)
//! - `streaming` (opt-in): real-time output (enables optional `rodio` dep)
//!
//! # Quick start
//! ## Decode and render without threads
//! ```no_run
//! # #[cfg(feature = "replayer")]
//! # {
//! use std::sync::Arc;
//! use modplay::{load_file, PlayerConfig, SongPlayer};
//! let song = Arc::new(load_file("song.mod").unwrap());
//! let mut player = SongPlayer::new(song, &PlayerConfig::default()).unwrap();
//! let audio = player.render_ticks(64);
//! # }
//! ```
//!
//! ## Threaded pipeline
//! ```no_run
//! # #[cfg(feature = "replayer")]
//! # {
//! use std::sync::Arc;
//! use modplay::replayer::frame_channel;
//! use modplay::{load_file, Pipeline, PlayerConfig};
//! let song = Arc::new(load_file("song.mod").unwrap());
//! let config = PlayerConfig::default();
//! let (sink, frames) = frame_channel(config.sink_queue_len, config.sink_timeout());
//! let handle = Pipeline::new(song, &config)
//!     .unwrap()
//!     .with_sink(sink)
//!     .with_tick_limit(256)
//!     .spawn()
//!     .unwrap();
//! for frame in frames.iter().take(256) {
//!     // play `frame`
//! #   let _ = frame;
//! }
//! let stats = handle.join().unwrap();
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod song;

#[cfg(feature = "mod-format")]
pub mod compression; // Data Decompression (LHA/LZH)
#[cfg(feature = "mod-format")]
pub mod mod_loader; // Module File I/O
#[cfg(feature = "mod-format")]
pub mod mod_parser; // Module Format Parsing
#[cfg(feature = "replayer")]
pub mod replayer; // Render Pipeline
#[cfg(feature = "streaming")]
pub mod streaming; // Audio Output & Streaming
#[cfg(feature = "visualization")]
pub mod visualization; // Terminal UI Helpers

pub use error::{BackpressureError, FormatError, IndexError, ModError, Result, SyncError};

pub use config::{ChannelMask, Interpolation, PlayerConfig, TimingConfig};
pub use song::{Effect, FormatVariant, Note, Pattern, Sample, Song};

#[cfg(feature = "mod-format")]
pub use compression::decompress_if_needed;
#[cfg(feature = "mod-format")]
pub use mod_loader::{load_file, ModFileLoader};
#[cfg(feature = "mod-format")]
pub use mod_parser::{decode, FormatParser, ModParser};
#[cfg(feature = "replayer")]
pub use replayer::{BeatCursor, Pipeline, PipelineHandle, SongPlayer, StatsSnapshot};
#[cfg(feature = "streaming")]
pub use streaming::{AudioDevice, RealtimePlayer, RingBuffer, SinkPump, StreamConfig};
#[cfg(feature = "visualization")]
pub use visualization::{create_level_bar, ChannelMonitor};
