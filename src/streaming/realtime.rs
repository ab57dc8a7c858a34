//! Producer side of the output stream

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{RingBuffer, StreamConfig, BUFFER_BACKOFF_MICROS};
use crate::Result;

/// Counters for the output stream.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StreamStats {
    /// Writes that did not fit completely
    pub overrun_count: usize,
    /// Samples handed to the ring buffer
    pub samples_written: usize,
    /// Ring buffer fill level after the last write
    pub fill_ratio: f32,
}

/// Writes mixed audio into the ring buffer the audio device reads from.
#[derive(Debug)]
pub struct RealtimePlayer {
    buffer: Arc<RingBuffer>,
    config: StreamConfig,
    stats: Mutex<StreamStats>,
}

impl RealtimePlayer {
    /// Allocate the ring buffer for `config`.
    pub fn new(config: StreamConfig) -> Result<Self> {
        Ok(RealtimePlayer {
            buffer: Arc::new(RingBuffer::new(config.ring_buffer_size)?),
            config,
            stats: Mutex::new(StreamStats::default()),
        })
    }

    /// Write all of `samples`, backing off while the buffer is full.
    ///
    /// Gives up early when `stop` is raised. Returns the count written.
    pub fn write_blocking(&self, samples: &[f32], stop: &AtomicBool) -> usize {
        let mut remaining = samples;
        while !remaining.is_empty() && !stop.load(Ordering::Acquire) {
            let written = self.buffer.write(remaining);
            self.record(written, false);
            if written == 0 {
                std::thread::sleep(Duration::from_micros(BUFFER_BACKOFF_MICROS));
            } else {
                remaining = &remaining[written..];
            }
        }
        samples.len() - remaining.len()
    }

    /// Write what fits now. A partial write counts as an overrun.
    pub fn write_nonblocking(&self, samples: &[f32]) -> usize {
        let written = self.buffer.write(samples);
        self.record(written, written < samples.len());
        written
    }

    fn record(&self, written: usize, overrun: bool) {
        let mut stats = self.stats.lock();
        stats.samples_written += written;
        stats.fill_ratio = self.buffer.fill_ratio();
        if overrun {
            stats.overrun_count += 1;
        }
    }

    /// Room left in the ring buffer
    pub fn available_write(&self) -> usize {
        self.buffer.available_write()
    }

    /// Current counters
    pub fn stats(&self) -> StreamStats {
        *self.stats.lock()
    }

    /// Drop everything still queued.
    pub fn flush(&self) {
        self.buffer.clear();
    }

    /// Fill level, 0.0 to 1.0
    pub fn fill_ratio(&self) -> f32 {
        self.buffer.fill_ratio()
    }

    /// Buffered audio in milliseconds
    pub fn latency_ms(&self) -> f32 {
        self.config.latency_ms()
    }

    /// Stream parameters
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// The ring buffer, for the audio device
    pub fn buffer(&self) -> Arc<RingBuffer> {
        Arc::clone(&self.buffer)
    }
}

impl Drop for RealtimePlayer {
    fn drop(&mut self) {
        let stats = self.stats.lock();
        tracing::debug!(
            samples = stats.samples_written,
            overruns = stats.overrun_count,
            "output stream closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonblocking_overrun() {
        let player = RealtimePlayer::new(StreamConfig {
            ring_buffer_size: 8,
            sample_rate: 8_000,
            channels: 1,
        })
        .unwrap();
        assert_eq!(player.write_nonblocking(&[0.5; 6]), 6);
        assert_eq!(player.write_nonblocking(&[0.5; 6]), 2);

        let stats = player.stats();
        assert_eq!(stats.samples_written, 8);
        assert_eq!(stats.overrun_count, 1);
        assert_eq!(stats.fill_ratio, 1.0);
    }

    #[test]
    fn test_flush_drops_queued_audio() {
        let player = RealtimePlayer::new(StreamConfig {
            ring_buffer_size: 8,
            sample_rate: 8_000,
            channels: 1,
        })
        .unwrap();
        player.write_nonblocking(&[0.5; 6]);
        assert!(player.fill_ratio() > 0.0);

        player.flush();
        assert_eq!(player.fill_ratio(), 0.0);
        assert_eq!(player.available_write(), 8);
    }

    #[test]
    fn test_blocking_write_stops_on_flag() {
        let player = RealtimePlayer::new(StreamConfig {
            ring_buffer_size: 4,
            sample_rate: 8_000,
            channels: 1,
        })
        .unwrap();
        let stop = AtomicBool::new(false);
        assert_eq!(player.write_blocking(&[0.1; 4], &stop), 4);

        stop.store(true, Ordering::Release);
        assert_eq!(player.write_blocking(&[0.1; 4], &stop), 0);
    }

    #[test]
    fn test_blocking_write_waits_for_reader() {
        let player = Arc::new(
            RealtimePlayer::new(StreamConfig {
                ring_buffer_size: 4,
                sample_rate: 8_000,
                channels: 1,
            })
            .unwrap(),
        );
        let buffer = player.buffer();
        let reader = std::thread::spawn(move || {
            let mut got = Vec::new();
            let mut chunk = [0.0; 4];
            while got.len() < 10 {
                let n = buffer.read(&mut chunk);
                got.extend_from_slice(&chunk[..n]);
                std::thread::yield_now();
            }
            got
        });

        let data: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let stop = AtomicBool::new(false);
        assert_eq!(player.write_blocking(&data, &stop), 10);
        assert_eq!(reader.join().unwrap(), data);
    }
}
