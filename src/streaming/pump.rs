//! Sink pump
//!
//! Drains the mixer's bounded hand-off into the output stream on its own
//! thread, so a slow audio device shows up as dropped frames at the mixer and
//! never as a stalled render pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use super::RealtimePlayer;
use crate::replayer::barrier::STOP_POLL_INTERVAL;
use crate::Result;

/// A running pump thread.
#[derive(Debug)]
pub struct SinkPump {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<u64>>,
}

impl SinkPump {
    /// Start forwarding frames from `frames` into `output`.
    ///
    /// The pump exits when `stop` is raised or every sender is gone.
    pub fn spawn(
        frames: Receiver<Vec<f32>>,
        output: Arc<RealtimePlayer>,
        stop: Arc<AtomicBool>,
    ) -> Result<Self> {
        let flag = stop.clone();
        let thread = thread::Builder::new()
            .name("sink-pump".to_string())
            .spawn(move || pump(&frames, &output, &flag))?;
        Ok(SinkPump {
            stop,
            thread: Some(thread),
        })
    }

    /// Stop the pump and return how many frames it forwarded.
    pub fn shutdown(self) -> u64 {
        self.stop.store(true, Ordering::Release);
        self.join()
    }

    /// Wait for the pump to run dry (all senders dropped) or be stopped.
    pub fn join(mut self) -> u64 {
        self.thread
            .take()
            .and_then(|t| t.join().ok())
            .unwrap_or_default()
    }
}

impl Drop for SinkPump {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.stop.store(true, Ordering::Release);
            let _ = thread.join();
        }
    }
}

fn pump(frames: &Receiver<Vec<f32>>, output: &RealtimePlayer, stop: &AtomicBool) -> u64 {
    let mut forwarded = 0u64;
    while !stop.load(Ordering::Acquire) {
        match frames.recv_timeout(STOP_POLL_INTERVAL) {
            Ok(frame) => {
                output.write_blocking(&frame, stop);
                forwarded += 1;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    tracing::debug!(frames = forwarded, "sink pump stopped");
    forwarded
}
