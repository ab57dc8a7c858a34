//! Pipeline counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the running pipeline.
#[derive(Debug, Default)]
pub struct PipelineStats {
    ticks: AtomicU64,
    dropped_frames: AtomicU64,
    index_errors: AtomicU64,
}

/// A point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Ticks mixed
    pub ticks: u64,
    /// Mixed frames the sink did not take in time
    pub dropped_frames: u64,
    /// Channel renders that hit a missing pattern, row or sample
    pub index_errors: u64,
}

impl PipelineStats {
    /// Fresh counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one mixed tick and return the new total.
    pub fn record_tick(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Count one dropped frame.
    pub fn record_drop(&self) {
        self.dropped_frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one failed channel render.
    pub fn record_index_error(&self) {
        self.index_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Ticks mixed so far
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Copy all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            dropped_frames: self.dropped_frames.load(Ordering::Relaxed),
            index_errors: self.index_errors.load(Ordering::Relaxed),
        }
    }
}
