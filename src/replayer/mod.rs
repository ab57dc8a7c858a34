//! Replayer Domain
//!
//! Turns a decoded [`Song`](crate::song::Song) into audio, one tick at a time.
//!
//! Per tick every active channel renders its frame ([`ChannelRenderer`]), the
//! frames are averaged ([`FrameMixer`]) and the [`BeatCursor`] moves one row on.
//! [`Pipeline`] runs one thread per channel in lock-step behind a [`TickBarrier`];
//! [`SongPlayer`] does the same work in the caller's thread.

pub mod barrier;
pub mod channel_state;
pub mod cursor;
pub mod effects;
pub mod mixer;
pub mod pipeline;
pub mod player;
pub mod renderer;
pub mod resample;
pub mod stats;
pub mod window;

pub use barrier::{BarrierRole, BreakOnPanic, TickBarrier};
pub use channel_state::ChannelState;
pub use cursor::{BeatCursor, SharedCursor};
pub use effects::{EffectTransform, Passthrough, VolumeTransform};
pub use mixer::{frame_channel, mix, mix_into, FrameMixer, FrameSink};
pub use pipeline::{ChannelFrames, Pipeline, PipelineHandle};
pub use player::SongPlayer;
pub use renderer::ChannelRenderer;
pub use resample::{Transposed, HALF_TONE, PRIMARY_PERIOD, RECORD_RATE};
pub use stats::{PipelineStats, StatsSnapshot};
pub use window::{extract_window, fill_window};
