//! Frame mixer and sink hand-off
//!
//! Once every channel has rendered a tick, the mixer averages their frames, sends
//! the result to the sink and moves the cursor on. The sink hand-off is bounded:
//! a sink that cannot keep up loses frames instead of stalling the renderers.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender};

use super::cursor::{BeatCursor, SharedCursor};
use super::stats::PipelineStats;
use crate::error::BackpressureError;

/// Average `frames` sample-wise into `out`, clamped to [-1, 1].
///
/// Frames shorter than `out` count as silence past their end. With no frames the
/// output is silence.
pub fn mix_into<F: AsRef<[f32]>>(frames: &[F], out: &mut [f32]) {
    out.fill(0.0);
    if frames.is_empty() {
        return;
    }

    for frame in frames {
        for (acc, &s) in out.iter_mut().zip(frame.as_ref()) {
            *acc += s;
        }
    }

    let n = frames.len() as f32;
    for s in out.iter_mut() {
        *s = (*s / n).clamp(-1.0, 1.0);
    }
}

/// Average `frames` into a new buffer of `frame_size` samples.
pub fn mix<F: AsRef<[f32]>>(frames: &[F], frame_size: usize) -> Vec<f32> {
    let mut out = vec![0.0; frame_size];
    mix_into(frames, &mut out);
    out
}

/// Sending half of the mixer → sink hand-off.
#[derive(Debug, Clone)]
pub struct FrameSink {
    tx: Sender<Vec<f32>>,
    timeout: Duration,
}

impl FrameSink {
    /// Offer a frame to the sink, waiting at most the configured timeout.
    pub fn send(&self, frame: Vec<f32>) -> Result<(), BackpressureError> {
        self.tx
            .send_timeout(frame, self.timeout)
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => BackpressureError::Timeout(self.timeout),
                SendTimeoutError::Disconnected(_) => BackpressureError::Disconnected,
            })
    }

    /// Hand-off timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Create a hand-off holding up to `capacity` frames.
pub fn frame_channel(capacity: usize, timeout: Duration) -> (FrameSink, Receiver<Vec<f32>>) {
    let (tx, rx) = bounded(capacity.max(1));
    (FrameSink { tx, timeout }, rx)
}

/// The per-tick release step: mix, hand off, advance.
#[derive(Debug)]
pub struct FrameMixer {
    frame_size: usize,
    sink: Option<FrameSink>,
    cursor: Arc<SharedCursor>,
    stats: Arc<PipelineStats>,
}

impl FrameMixer {
    /// Create a mixer that advances `cursor` once per tick.
    pub fn new(
        frame_size: usize,
        sink: Option<FrameSink>,
        cursor: Arc<SharedCursor>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        FrameMixer {
            frame_size,
            sink,
            cursor,
            stats,
        }
    }

    /// Finish one tick. Returns the cursor for the next tick.
    ///
    /// A frame the sink does not accept is dropped and counted; the cursor
    /// advances either way.
    pub fn tick<F: AsRef<[f32]>>(&self, frames: &[F]) -> BeatCursor {
        let mixed = mix(frames, self.frame_size);

        if let Some(sink) = &self.sink {
            if let Err(e) = sink.send(mixed) {
                self.stats.record_drop();
                match e {
                    BackpressureError::Timeout(_) => tracing::warn!("{}", e),
                    BackpressureError::Disconnected => tracing::debug!("{}", e),
                }
            }
        }

        self.stats.record_tick();
        self.cursor.advance()
    }

    /// Output samples per tick
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }
}
