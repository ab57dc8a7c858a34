//! Streaming Domain
//!
//! Real-time output for the render pipeline. Mixed frames leave the pipeline
//! through the bounded [`FrameSink`](crate::replayer::FrameSink) hand-off; a
//! [`SinkPump`] thread drains that hand-off into the [`RealtimePlayer`] ring
//! buffer, and the [`AudioDevice`] plays the ring buffer through rodio.

pub mod audio_device;
pub mod pump;
pub mod realtime;
pub mod ring_buffer;

pub use audio_device::AudioDevice;
pub use pump::SinkPump;
pub use realtime::{RealtimePlayer, StreamStats};
pub use ring_buffer::RingBuffer;

use crate::config::TimingConfig;

/// Back-off while the ring buffer is full, in microseconds
pub const BUFFER_BACKOFF_MICROS: u64 = 100;

/// Output stream parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Ring buffer size in samples. Rounded up to a power of two.
    pub ring_buffer_size: usize,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Output channels (the mix is mono)
    pub channels: u16,
}

impl StreamConfig {
    /// 4096 samples of buffering
    pub fn low_latency(sample_rate: u32) -> Self {
        StreamConfig {
            ring_buffer_size: 4096,
            sample_rate,
            channels: 1,
        }
    }

    /// 16384 samples of buffering
    pub fn stable(sample_rate: u32) -> Self {
        StreamConfig {
            ring_buffer_size: 16384,
            sample_rate,
            channels: 1,
        }
    }

    /// Room for `ticks` frames at the given timing.
    pub fn for_timing(timing: &TimingConfig, ticks: usize) -> Self {
        StreamConfig {
            ring_buffer_size: timing.frame_size.saturating_mul(ticks.max(1)),
            sample_rate: timing.playback_rate,
            channels: 1,
        }
    }

    /// Buffered audio in milliseconds
    pub fn latency_ms(&self) -> f32 {
        (self.ring_buffer_size as f32 / self.sample_rate as f32) * 1000.0
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::stable(crate::config::DEFAULT_PLAYBACK_RATE)
    }
}
