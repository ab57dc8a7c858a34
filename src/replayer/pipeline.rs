//! Threaded render pipeline
//!
//! One worker thread per active channel. Each tick every worker reads the shared
//! cursor, renders its frame into its own buffer and arrives at the
//! [`TickBarrier`]. The last arrival mixes all buffers, hands the result to the
//! sink and advances the cursor before anyone is let go, so the order per tick is
//! always render, mix, advance.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::RwLock;

use super::barrier::{BreakOnPanic, TickBarrier};
use super::cursor::{BeatCursor, SharedCursor};
use super::effects::{EffectTransform, Passthrough};
use super::mixer::{FrameMixer, FrameSink};
use super::renderer::ChannelRenderer;
use super::stats::{PipelineStats, StatsSnapshot};
use crate::config::{Interpolation, PlayerConfig, TimingConfig};
use crate::error::{ModError, Result, SyncError};
use crate::song::Song;

/// The per-channel frame buffers.
///
/// Each buffer has one writer (its channel worker) and is read by the mixer while
/// all workers are parked at the barrier. Monitors may peek with
/// [`ChannelFrames::try_snapshot`], which never blocks and may see a frame
/// mid-render.
#[derive(Debug)]
pub struct ChannelFrames {
    channels: Vec<usize>,
    frames: Vec<RwLock<Vec<f32>>>,
}

impl ChannelFrames {
    /// Silent buffers of `frame_size` samples for each channel in `channels`.
    pub fn new(channels: &[usize], frame_size: usize) -> Self {
        ChannelFrames {
            channels: channels.to_vec(),
            frames: channels
                .iter()
                .map(|_| RwLock::new(vec![0.0; frame_size]))
                .collect(),
        }
    }

    /// Channel numbers, in buffer order
    pub fn channels(&self) -> &[usize] {
        &self.channels
    }

    /// Copy a channel's current frame without waiting. `None` if the channel is
    /// not active or its buffer is being written.
    pub fn try_snapshot(&self, channel_no: usize) -> Option<Vec<f32>> {
        let slot = self.channels.iter().position(|&ch| ch == channel_no)?;
        self.frames[slot].try_read().map(|frame| frame.clone())
    }

    fn slot(&self, idx: usize) -> &RwLock<Vec<f32>> {
        &self.frames[idx]
    }

    /// Mix all buffers. Only called while every writer is parked.
    fn mix_with(&self, mixer: &FrameMixer) -> BeatCursor {
        let guards: Vec<_> = self.frames.iter().map(|frame| frame.read()).collect();
        let views: Vec<&[f32]> = guards.iter().map(|frame| frame.as_slice()).collect();
        mixer.tick(&views)
    }
}

/// Everything a pipeline needs, ready to spawn.
pub struct Pipeline {
    song: Arc<Song>,
    channels: Vec<usize>,
    timing: TimingConfig,
    interpolation: Interpolation,
    start: BeatCursor,
    effects: Arc<dyn EffectTransform>,
    sink: Option<FrameSink>,
    tick_limit: Option<u64>,
}

impl Pipeline {
    /// Prepare a pipeline for `song`. Fails if the config does not fit the song.
    pub fn new(song: Arc<Song>, config: &PlayerConfig) -> Result<Self> {
        config.validate_for(&song)?;
        Ok(Pipeline {
            channels: config.active_channels()?,
            timing: config.timing()?,
            interpolation: config.interpolation,
            start: BeatCursor::new(config.start_pattern, config.start_note),
            effects: Arc::new(Passthrough),
            sink: None,
            tick_limit: None,
            song,
        })
    }

    /// Send mixed frames to `sink`. Without a sink they are discarded.
    pub fn with_sink(mut self, sink: FrameSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Use `effects` on every channel.
    pub fn with_effects(mut self, effects: Arc<dyn EffectTransform>) -> Self {
        self.effects = effects;
        self
    }

    /// Stop by itself after `ticks` mixed ticks. A limit of 0 renders nothing.
    pub fn with_tick_limit(mut self, ticks: u64) -> Self {
        self.tick_limit = Some(ticks);
        self
    }

    /// Tick timing
    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Start the worker threads.
    pub fn spawn(self) -> Result<PipelineHandle> {
        // a zero limit mixes nothing
        let stop = Arc::new(AtomicBool::new(self.tick_limit == Some(0)));
        let stats = Arc::new(PipelineStats::new());
        let cursor = Arc::new(SharedCursor::new(self.start, self.song.play_bound()));
        let frames = Arc::new(ChannelFrames::new(&self.channels, self.timing.frame_size));

        let mixer = FrameMixer::new(
            self.timing.frame_size,
            self.sink,
            cursor.clone(),
            stats.clone(),
        );
        let barrier = {
            let (frames, stats, stop) = (frames.clone(), stats.clone(), stop.clone());
            let tick_limit = self.tick_limit;
            Arc::new(TickBarrier::new(self.channels.len(), move || {
                let next = frames.mix_with(&mixer);
                tracing::trace!(pattern = next.pattern_idx, note = next.note_idx, "tick mixed");
                if tick_limit.is_some_and(|limit| stats.ticks() >= limit) {
                    stop.store(true, Ordering::Release);
                }
            }))
        };

        let mut handle = PipelineHandle {
            stop,
            stats,
            cursor,
            frames,
            workers: Vec::with_capacity(self.channels.len()),
        };

        for (slot, &channel_no) in self.channels.iter().enumerate() {
            let worker = ChannelWorker {
                slot,
                renderer: ChannelRenderer::new(channel_no, &self.timing, self.interpolation)
                    .with_effects(self.effects.clone()),
                song: self.song.clone(),
                cursor: handle.cursor.clone(),
                frames: handle.frames.clone(),
                barrier: barrier.clone(),
                stop: handle.stop.clone(),
                stats: handle.stats.clone(),
            };
            let spawned = thread::Builder::new()
                .name(format!("channel-{}", channel_no))
                .spawn(move || worker.run());
            match spawned {
                Ok(join) => handle.workers.push(join),
                Err(e) => {
                    handle.stop();
                    return Err(ModError::Io(e));
                }
            }
        }

        tracing::info!(
            channels = ?self.channels,
            frame_size = self.timing.frame_size,
            playback_rate = self.timing.playback_rate,
            start = ?self.start,
            "render pipeline started"
        );
        Ok(handle)
    }
}

struct ChannelWorker {
    slot: usize,
    renderer: ChannelRenderer,
    song: Arc<Song>,
    cursor: Arc<SharedCursor>,
    frames: Arc<ChannelFrames>,
    barrier: Arc<TickBarrier>,
    stop: Arc<AtomicBool>,
    stats: Arc<PipelineStats>,
}

impl ChannelWorker {
    fn run(mut self) -> std::result::Result<(), SyncError> {
        let barrier = self.barrier.clone();
        let _guard = BreakOnPanic::new(&barrier);
        let channel_no = self.renderer.channel_no();

        loop {
            if self.stop.load(Ordering::Acquire) {
                return Ok(());
            }

            let cursor = self.cursor.load();
            {
                let mut frame = self.frames.slot(self.slot).write();
                if let Err(e) = self.renderer.render(&self.song, cursor, &mut frame) {
                    self.stats.record_index_error();
                    tracing::warn!(channel = channel_no, error = %e, "channel silent for this tick");
                }
            }

            match barrier.wait(&self.stop) {
                Ok(_) => {}
                Err(SyncError::Cancelled) => {
                    tracing::debug!(channel = channel_no, "channel worker stopped");
                    return Ok(());
                }
                Err(SyncError::Broken) => {
                    self.stop.store(true, Ordering::Release);
                    return Err(SyncError::Broken);
                }
            }
        }
    }
}

/// A running pipeline. Dropping it stops and joins the workers.
pub struct PipelineHandle {
    stop: Arc<AtomicBool>,
    stats: Arc<PipelineStats>,
    cursor: Arc<SharedCursor>,
    frames: Arc<ChannelFrames>,
    workers: Vec<JoinHandle<std::result::Result<(), SyncError>>>,
}

impl PipelineHandle {
    /// Raise the stop flag. Workers leave at their next check.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// The shared stop flag
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// True once the stop flag is up
    pub fn is_stopping(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// True once every worker has exited
    pub fn is_finished(&self) -> bool {
        self.workers.iter().all(|w| w.is_finished())
    }

    /// Current counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Position of the tick being rendered
    pub fn cursor(&self) -> BeatCursor {
        self.cursor.load()
    }

    /// Per-channel buffers, for monitoring
    pub fn frames(&self) -> Arc<ChannelFrames> {
        self.frames.clone()
    }

    /// Wait for the workers to exit on their own (tick limit, stop flag or failure).
    pub fn join(mut self) -> Result<StatsSnapshot> {
        self.join_workers()?;
        Ok(self.stats.snapshot())
    }

    /// Stop and wait for the workers.
    pub fn shutdown(self) -> Result<StatsSnapshot> {
        self.stop();
        self.join()
    }

    fn join_workers(&mut self) -> Result<()> {
        let mut failure = None;
        for worker in self.workers.drain(..) {
            let outcome = worker.join().unwrap_or(Err(SyncError::Broken));
            if let Err(e) = outcome {
                failure.get_or_insert(e);
            }
        }

        match failure {
            Some(e) => {
                tracing::error!(error = %e, "render pipeline failed");
                Err(ModError::Sync(e))
            }
            None => {
                tracing::info!(ticks = self.stats.ticks(), "render pipeline stopped");
                Ok(())
            }
        }
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.stop();
            let _ = self.join_workers();
        }
    }
}
