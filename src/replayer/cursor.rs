//! Song position
//!
//! [`BeatCursor`] is a plain `(play position, row)` pair with carry increment.
//! [`SharedCursor`] publishes it to the channel workers: one writer (the mixer),
//! many readers, every read a whole snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::song::ROWS_PER_PATTERN;

/// Position in the song.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BeatCursor {
    /// Play-order position
    pub pattern_idx: usize,
    /// Row within the pattern
    pub note_idx: usize,
}

impl BeatCursor {
    /// Start of the song
    pub const START: BeatCursor = BeatCursor {
        pattern_idx: 0,
        note_idx: 0,
    };

    /// Cursor at an explicit position
    pub fn new(pattern_idx: usize, note_idx: usize) -> Self {
        BeatCursor {
            pattern_idx,
            note_idx,
        }
    }

    /// Move to the next row.
    ///
    /// Running off the last row moves to the next play position; running off `bound`
    /// (the song's play bound) wraps to the start.
    pub fn advance(&mut self, bound: usize) {
        self.note_idx += 1;
        if self.note_idx < ROWS_PER_PATTERN {
            return;
        }

        self.note_idx = 0;
        self.pattern_idx += 1;
        if self.pattern_idx >= bound {
            *self = BeatCursor::START;
        }
    }

    /// The cursor one row later.
    pub fn advanced(mut self, bound: usize) -> Self {
        self.advance(bound);
        self
    }

    /// True if the cursor addresses a row inside `bound` play positions.
    pub fn is_within(&self, bound: usize) -> bool {
        self.pattern_idx < bound && self.note_idx < ROWS_PER_PATTERN
    }

    fn pack(self) -> u64 {
        ((self.pattern_idx as u64) << 32) | (self.note_idx as u64 & 0xFFFF_FFFF)
    }

    fn unpack(packed: u64) -> Self {
        BeatCursor {
            pattern_idx: (packed >> 32) as usize,
            note_idx: (packed & 0xFFFF_FFFF) as usize,
        }
    }
}

/// A [`BeatCursor`] shared between threads.
///
/// Both fields live in one atomic word, so readers never see a pattern index from
/// one row paired with a note index from another.
#[derive(Debug)]
pub struct SharedCursor {
    packed: AtomicU64,
    bound: usize,
}

impl SharedCursor {
    /// Publish `start` for a song whose play bound is `bound`.
    ///
    /// A start position outside the bound is reset to the beginning.
    pub fn new(start: BeatCursor, bound: usize) -> Self {
        let bound = bound.max(1);
        let start = if start.is_within(bound) {
            start
        } else {
            tracing::warn!(
                pattern = start.pattern_idx,
                note = start.note_idx,
                bound,
                "start position outside the song, starting from the top"
            );
            BeatCursor::START
        };
        SharedCursor {
            packed: AtomicU64::new(start.pack()),
            bound,
        }
    }

    /// Current position
    pub fn load(&self) -> BeatCursor {
        BeatCursor::unpack(self.packed.load(Ordering::Acquire))
    }

    /// Advance by one row and return the new position.
    ///
    /// Only one thread (the mixer) may call this.
    pub fn advance(&self) -> BeatCursor {
        let next = self.load().advanced(self.bound);
        self.packed.store(next.pack(), Ordering::Release);
        next
    }

    /// Number of play positions the cursor cycles through
    pub fn bound(&self) -> usize {
        self.bound
    }
}
