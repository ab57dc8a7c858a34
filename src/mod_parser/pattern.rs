//! Packed pattern data
//!
//! Each pattern is 64 rows × 4 channels × 4 bytes. The note for `(channel, row)` of
//! pattern `p` lives at `PATTERNS_OFFSET + p*1024 + channel*4 + row*16`.
//!
//! Note word bits (bit 0 = MSB):
//! ```text
//! ssss pppppppppppp ssss eeeeeeeeeeee
//! 0-3  4-15         16-19 20-31
//! ```

use super::bits::{extract_bits, extract_u16};
use super::effects::decode_effect;
use super::header::PATTERNS_OFFSET;
use crate::error::FormatError;
use crate::song::{Note, Pattern, CHANNEL_COUNT, ROWS_PER_PATTERN};

/// Bytes per note
pub const NOTE_SIZE: usize = 4;
/// Bytes per row (all channels)
pub const ROW_SIZE: usize = NOTE_SIZE * CHANNEL_COUNT;
/// Bytes per pattern
pub const PATTERN_SIZE: usize = ROW_SIZE * ROWS_PER_PATTERN;

/// Byte address of a note.
pub fn note_address(pattern: usize, channel: usize, row: usize) -> usize {
    PATTERNS_OFFSET + pattern * PATTERN_SIZE + channel * NOTE_SIZE + row * ROW_SIZE
}

/// Decode one 4-byte note word.
///
/// The stored sample number is 1-based; 0 (and any number past `sample_count`)
/// becomes "continue the current sample".
pub fn decode_note(word: &[u8; 4], sample_count: usize) -> Result<Note, FormatError> {
    let sample_hi = extract_bits(word, 0, 3)?;
    let sample_lo = extract_bits(word, 16, 19)?;
    let sample_no = ((sample_hi << 4) | sample_lo) as usize;

    let sample = match sample_no.checked_sub(1) {
        Some(idx) if idx < sample_count => Some(idx),
        Some(idx) => {
            tracing::debug!(sample = idx, "note references a missing sample, treated as continue");
            None
        }
        None => None,
    };

    Ok(Note {
        sample,
        period: extract_u16(word, 4, 15)?,
        effect: decode_effect(extract_u16(word, 20, 31)?),
    })
}

/// Decode `count` patterns starting at [`PATTERNS_OFFSET`].
pub fn decode_patterns(
    data: &[u8],
    count: usize,
    sample_count: usize,
) -> Result<Vec<Pattern>, FormatError> {
    let needed = PATTERNS_OFFSET + count * PATTERN_SIZE;
    if data.len() < needed {
        return Err(FormatError::TooShort {
            what: "pattern data",
            needed,
            actual: data.len(),
        });
    }

    let mut patterns = Vec::with_capacity(count);
    for pattern_idx in 0..count {
        let mut pattern = Pattern::default();
        for channel in 0..CHANNEL_COUNT {
            for row in 0..ROWS_PER_PATTERN {
                let addr = note_address(pattern_idx, channel, row);
                let mut word = [0u8; NOTE_SIZE];
                word.copy_from_slice(&data[addr..addr + NOTE_SIZE]);
                pattern.set_note(channel, row, decode_note(&word, sample_count)?);
            }
        }
        patterns.push(pattern);
    }
    Ok(patterns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::{Effect, EffectId};

    /// Pack a note the way trackers store it.
    fn pack(sample_no: u8, period: u16, effect: u16) -> [u8; 4] {
        [
            (sample_no & 0xF0) | ((period >> 8) as u8 & 0x0F),
            (period & 0xFF) as u8,
            ((sample_no & 0x0F) << 4) | ((effect >> 8) as u8 & 0x0F),
            (effect & 0xFF) as u8,
        ]
    }

    #[test]
    fn test_pattern_size() {
        assert_eq!(PATTERN_SIZE, 1024);
        assert_eq!(note_address(0, 0, 0), 0x043C);
        assert_eq!(note_address(1, 3, 2), 0x043C + 1024 + 12 + 32);
    }

    #[test]
    fn test_decode_trigger() {
        let note = decode_note(&pack(1, 214, 0xC20), 31).unwrap();
        assert_eq!(note.sample, Some(0));
        assert_eq!(note.period, 214);
        assert_eq!(note.effect, Effect::SetVolume(0x20));
    }

    #[test]
    fn test_decode_high_sample_number() {
        // sample 0x1F uses both nibbles
        let note = decode_note(&pack(0x1F, 856, 0xE93), 31).unwrap();
        assert_eq!(note.sample, Some(30));
        assert_eq!(note.period, 856);
        assert_eq!(note.effect, Effect::Extended(EffectId::RetriggerNote, 3));
    }

    #[test]
    fn test_decode_continue() {
        let note = decode_note(&pack(0, 0, 0x000), 31).unwrap();
        assert!(note.is_continue());
        assert!(note.effect.is_noop());
    }

    #[test]
    fn test_decode_missing_sample_is_continue() {
        let note = decode_note(&pack(0x20, 428, 0), 31).unwrap();
        assert_eq!(note.sample, None);
        assert_eq!(note.period, 428);
    }

    #[test]
    fn test_decode_patterns_addressing() {
        let mut data = vec![0u8; PATTERNS_OFFSET + 2 * PATTERN_SIZE];
        let addr = note_address(1, 2, 63);
        data[addr..addr + 4].copy_from_slice(&pack(5, 113, 0x0F3));

        let patterns = decode_patterns(&data, 2, 31).unwrap();
        assert_eq!(patterns.len(), 2);
        let note = patterns[1][2][63];
        assert_eq!(note.sample, Some(4));
        assert_eq!(note.period, 113);
        assert_eq!(note.effect, Effect::Arpeggio { x: 15, y: 3 });
        assert!(patterns[0][2][63].is_continue());
    }

    #[test]
    fn test_decode_patterns_truncated() {
        let data = vec![0u8; PATTERNS_OFFSET + PATTERN_SIZE - 1];
        assert!(matches!(
            decode_patterns(&data, 1, 31),
            Err(FormatError::TooShort { what: "pattern data", .. })
        ));
    }
}
