//! rodio output device fed from the ring buffer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rodio::{OutputStream, Sink, Source};

use super::RingBuffer;
use crate::{ModError, Result};

const READ_CHUNK: usize = 4096;

/// rodio source pulling from the ring buffer. Underruns play silence.
struct RingBufferSource {
    ring: Arc<RingBuffer>,
    sample_rate: u32,
    channels: u16,
    finished: Arc<AtomicBool>,
    chunk: Vec<f32>,
    pos: usize,
    len: usize,
}

impl RingBufferSource {
    fn new(ring: Arc<RingBuffer>, sample_rate: u32, channels: u16, finished: Arc<AtomicBool>) -> Self {
        RingBufferSource {
            ring,
            sample_rate,
            channels,
            finished,
            chunk: vec![0.0; READ_CHUNK],
            pos: 0,
            len: 0,
        }
    }
}

impl Source for RingBufferSource {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.ring.available_read().max(READ_CHUNK))
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

impl Iterator for RingBufferSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.finished.load(Ordering::Relaxed) {
            return None;
        }

        if self.pos >= self.len {
            let read = self.ring.read(&mut self.chunk);
            if read == 0 {
                self.chunk.fill(0.0);
                self.len = self.chunk.len();
            } else {
                self.len = read;
            }
            self.pos = 0;
        }

        let sample = self.chunk[self.pos];
        self.pos += 1;
        Some(sample)
    }
}

/// System audio output playing a ring buffer.
pub struct AudioDevice {
    _stream: OutputStream,
    sink: Sink,
    finished: Arc<AtomicBool>,
}

impl AudioDevice {
    /// Open the default output device and start playing `ring`.
    pub fn new(sample_rate: u32, channels: u16, ring: Arc<RingBuffer>) -> Result<Self> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| ModError::AudioDeviceError(format!("cannot open output stream: {}", e)))?;
        let sink = Sink::try_new(&handle)
            .map_err(|e| ModError::AudioDeviceError(format!("cannot create sink: {}", e)))?;

        let finished = Arc::new(AtomicBool::new(false));
        sink.append(RingBufferSource::new(
            ring,
            sample_rate,
            channels,
            Arc::clone(&finished),
        ));
        tracing::info!(sample_rate, channels, "audio device opened");

        Ok(AudioDevice {
            _stream: stream,
            sink,
            finished,
        })
    }

    /// Pause output
    pub fn pause(&self) {
        self.sink.pause();
    }

    /// Resume output
    pub fn play(&self) {
        self.sink.play();
    }

    /// End the stream. The source stops asking for samples.
    pub fn finish(&self) {
        self.finished.store(true, Ordering::Relaxed);
    }
}

impl Drop for AudioDevice {
    fn drop(&mut self) {
        self.finish();
        self.sink.stop();
    }
}
