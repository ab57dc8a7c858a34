//! Terminal visualization helpers
//!
//! A read-only view of the pipeline's per-channel frames plus the level bars the
//! CLI draws from them. The monitor never blocks the renderers: a buffer that is
//! being written is simply skipped for that refresh.

use std::sync::Arc;

use crate::replayer::ChannelFrames;

/// Widest view the monitor takes of a frame
pub const MAX_VIEW_WIDTH: usize = 256;

/// Read-only snapshots of the channel buffers.
#[derive(Debug, Clone)]
pub struct ChannelMonitor {
    frames: Arc<ChannelFrames>,
    view_width: usize,
}

/// One channel as seen by the monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelView {
    /// Channel number
    pub channel_no: usize,
    /// Leading `view_width` samples of the frame, `None` if the buffer was busy
    pub samples: Option<Vec<f32>>,
}

impl ChannelView {
    /// Peak absolute amplitude, 0.0 when no snapshot was taken
    pub fn peak(&self) -> f32 {
        self.samples
            .as_deref()
            .map_or(0.0, |s| s.iter().fold(0.0f32, |acc, &v| acc.max(v.abs())))
    }
}

impl ChannelMonitor {
    /// Watch `frames`, whose frames hold `frame_size` samples.
    pub fn new(frames: Arc<ChannelFrames>, frame_size: usize) -> Self {
        ChannelMonitor {
            frames,
            view_width: frame_size.min(MAX_VIEW_WIDTH),
        }
    }

    /// Samples per view
    pub fn view_width(&self) -> usize {
        self.view_width
    }

    /// Snapshot one channel without waiting.
    pub fn snapshot(&self, channel_no: usize) -> Option<Vec<f32>> {
        let mut frame = self.frames.try_snapshot(channel_no)?;
        frame.truncate(self.view_width);
        Some(frame)
    }

    /// Snapshot every monitored channel.
    pub fn views(&self) -> Vec<ChannelView> {
        self.frames
            .channels()
            .iter()
            .map(|&channel_no| ChannelView {
                channel_no,
                samples: self.snapshot(channel_no),
            })
            .collect()
    }

    /// One status line: a level bar per channel.
    pub fn status_line(&self, bar_width: usize) -> String {
        self.views()
            .iter()
            .map(|view| {
                format!(
                    "CH{} [{}]",
                    view.channel_no,
                    create_level_bar(view.peak(), bar_width)
                )
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A bar of `max_length` cells, filled in proportion to `amplitude` (0.0 to 1.0).
pub fn create_level_bar(amplitude: f32, max_length: usize) -> String {
    let level = if amplitude.is_finite() {
        amplitude.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = ((level * max_length as f32).round() as usize).min(max_length);
    format!("{}{}", "█".repeat(filled), " ".repeat(max_length - filled))
}
