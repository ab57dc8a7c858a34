//! Sample ring buffer between the sink pump and the audio callback
//!
//! One producer (the pump) and one consumer (the rodio source). Storage sits
//! behind a `parking_lot::Mutex`; the read and write counters are atomics so
//! fill levels can be read without taking the lock. Counters only ever grow and
//! are folded into the storage with the capacity mask.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::{ModError, Result};

/// Largest ring buffer accepted, in samples (512 MB of `f32`)
pub const MAX_CAPACITY: usize = 512 * 1024 * 1024 / std::mem::size_of::<f32>();

/// Fixed-size circular sample buffer.
#[derive(Debug)]
pub struct RingBuffer {
    storage: Mutex<Vec<f32>>,
    written: AtomicUsize,
    read: AtomicUsize,
    capacity: usize,
    mask: usize,
}

impl RingBuffer {
    /// Create a buffer of at least `requested` samples, rounded up to a power of two.
    pub fn new(requested: usize) -> Result<Self> {
        if requested == 0 {
            return Err(ModError::ConfigError(
                "ring buffer capacity must be greater than 0".to_string(),
            ));
        }
        let capacity = requested.next_power_of_two();
        if capacity > MAX_CAPACITY {
            return Err(ModError::ConfigError(format!(
                "ring buffer capacity {capacity} exceeds maximum {MAX_CAPACITY}"
            )));
        }

        Ok(RingBuffer {
            storage: Mutex::new(vec![0.0; capacity]),
            written: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
            capacity,
            mask: capacity - 1,
        })
    }

    /// Capacity in samples
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples waiting to be read
    pub fn available_read(&self) -> usize {
        let written = self.written.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Acquire);
        written.wrapping_sub(read)
    }

    /// Free space in samples
    pub fn available_write(&self) -> usize {
        self.capacity - self.available_read()
    }

    /// Copy as much of `samples` as fits. Returns the count written.
    pub fn write(&self, samples: &[f32]) -> usize {
        let mut storage = self.storage.lock();
        let written = self.written.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Acquire);
        let count = samples.len().min(self.capacity - written.wrapping_sub(read));
        if count == 0 {
            return 0;
        }

        let at = written & self.mask;
        let first = count.min(self.capacity - at);
        storage[at..at + first].copy_from_slice(&samples[..first]);
        storage[..count - first].copy_from_slice(&samples[first..count]);
        drop(storage);

        self.written
            .store(written.wrapping_add(count), Ordering::Release);
        count
    }

    /// Fill `dest` from the buffer. Returns the count read.
    pub fn read(&self, dest: &mut [f32]) -> usize {
        let storage = self.storage.lock();
        let written = self.written.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Acquire);
        let count = dest.len().min(written.wrapping_sub(read));
        if count == 0 {
            return 0;
        }

        let at = read & self.mask;
        let first = count.min(self.capacity - at);
        dest[..first].copy_from_slice(&storage[at..at + first]);
        dest[first..count].copy_from_slice(&storage[..count - first]);
        drop(storage);

        self.read.store(read.wrapping_add(count), Ordering::Release);
        count
    }

    /// Drop everything not yet read.
    pub fn clear(&self) {
        let _storage = self.storage.lock();
        let written = self.written.load(Ordering::Acquire);
        self.read.store(written, Ordering::Release);
    }

    /// Fill level, 0.0 to 1.0
    pub fn fill_ratio(&self) -> f32 {
        self.available_read() as f32 / self.capacity as f32
    }
}
