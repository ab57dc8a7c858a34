//! Fixed-offset header: song name, sample table, play order and format tag
//!
//! Layout (offsets from file start):
//! - 0x0000: song name, 20 bytes, NUL padded
//! - 0x0014: 31 sample entries of 30 bytes
//! - 0x03B6: song length
//! - 0x03B7: repeat index
//! - 0x03B8: play order, 128 bytes
//! - 0x0438: format tag, 4 bytes

use nom::bytes::complete::take;
use nom::multi::count;
use nom::number::complete::{be_u16, be_u8};
use nom::IResult;

use super::bits::extract_bits;
use crate::error::FormatError;

/// Song name length
pub const SONG_NAME_LEN: usize = 20;
/// Sample name length
pub const SAMPLE_NAME_LEN: usize = 22;
/// Bytes per sample table entry
pub const SAMPLE_ENTRY_SIZE: usize = 30;
/// Sample table entries in the 31-sample layout
pub const SAMPLE_COUNT: usize = 31;
/// Play-order slots
pub const ORDER_SLOTS: usize = 128;

/// Offset of the sample table
pub const SAMPLE_TABLE_OFFSET: usize = 0x0014;
/// Offset of the song length byte
pub const SONG_LENGTH_OFFSET: usize = 0x03B6;
/// Offset of the repeat index byte
pub const REPEAT_IDX_OFFSET: usize = 0x03B7;
/// Offset of the play order
pub const ORDER_OFFSET: usize = 0x03B8;
/// Offset of the format tag
pub const MAGIC_OFFSET: usize = 0x0438;
/// Offset of the first pattern
pub const PATTERNS_OFFSET: usize = 0x043C;

/// One decoded sample table entry. Lengths are in frames (stored words × 2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleHeader {
    /// Sample name
    pub name: String,
    /// Length in frames
    pub length: usize,
    /// Raw 4-bit finetune
    pub finetune: u8,
    /// Volume 0-64
    pub volume: u8,
    /// Loop start in frames
    pub loop_start: usize,
    /// Loop length in frames
    pub loop_length: usize,
}

/// Everything before the pattern data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleHeader {
    /// Song name
    pub name: String,
    /// Sample table
    pub samples: Vec<SampleHeader>,
    /// Number of used play-order positions
    pub song_length: usize,
    /// Loop-back position
    pub repeat_idx: usize,
    /// All 128 play-order bytes
    pub order: Vec<u8>,
    /// Format tag
    pub magic: [u8; 4],
}

impl ModuleHeader {
    /// The used part of the play order.
    pub fn play_order(&self) -> Vec<usize> {
        self.order
            .iter()
            .take(self.song_length)
            .map(|&p| p as usize)
            .collect()
    }

    /// Patterns stored in the file: highest pattern in the play order plus one.
    pub fn pattern_count(&self) -> usize {
        self.order
            .iter()
            .take(self.song_length)
            .max()
            .map_or(0, |&max| max as usize + 1)
    }

    /// Total bytes of sample data the table announces.
    pub fn sample_data_len(&self) -> usize {
        self.samples.iter().map(|s| s.length).sum()
    }
}

/// Decode text fields: NULs dropped, bytes mapped one-to-one to chars.
pub fn decode_text(raw: &[u8]) -> String {
    raw.iter()
        .filter(|&&b| b != 0)
        .map(|&b| b as char)
        .collect()
}

fn sample_header(input: &[u8]) -> IResult<&[u8], (&[u8], u16, u8, u8, u16, u16)> {
    let (input, name) = take(SAMPLE_NAME_LEN)(input)?;
    let (input, length) = be_u16(input)?;
    let (input, finetune) = be_u8(input)?;
    let (input, volume) = be_u8(input)?;
    let (input, loop_start) = be_u16(input)?;
    let (input, loop_length) = be_u16(input)?;
    Ok((input, (name, length, finetune, volume, loop_start, loop_length)))
}

fn sample_entry(
    (name, length, finetune, volume, loop_start, loop_length): (&[u8], u16, u8, u8, u16, u16),
) -> Result<SampleHeader, FormatError> {
    Ok(SampleHeader {
        name: decode_text(name),
        length: length as usize * 2,
        finetune: extract_bits(&[finetune], 4, 7)? as u8,
        volume,
        loop_start: loop_start as usize * 2,
        loop_length: loop_length as usize * 2,
    })
}

#[allow(clippy::type_complexity)]
fn raw_header(
    input: &[u8],
) -> IResult<&[u8], (&[u8], Vec<(&[u8], u16, u8, u8, u16, u16)>, u8, u8, &[u8], &[u8])> {
    let (input, name) = take(SONG_NAME_LEN)(input)?;
    let (input, samples) = count(sample_header, SAMPLE_COUNT)(input)?;
    let (input, song_length) = be_u8(input)?;
    let (input, repeat_idx) = be_u8(input)?;
    let (input, order) = take(ORDER_SLOTS)(input)?;
    let (input, magic) = take(4usize)(input)?;
    Ok((input, (name, samples, song_length, repeat_idx, order, magic)))
}

/// Parse the header block at the start of `data`.
pub fn parse_header(data: &[u8]) -> Result<ModuleHeader, FormatError> {
    if data.len() < PATTERNS_OFFSET {
        return Err(FormatError::TooShort {
            what: "header",
            needed: PATTERNS_OFFSET,
            actual: data.len(),
        });
    }

    let (_, (name, raw_samples, song_length, repeat_idx, order, magic)) =
        raw_header(data).map_err(|e| FormatError::Header(e.to_string()))?;

    let samples = raw_samples
        .into_iter()
        .map(sample_entry)
        .collect::<Result<Vec<_>, FormatError>>()?;

    let mut tag = [0u8; 4];
    tag.copy_from_slice(magic);

    Ok(ModuleHeader {
        name: decode_text(name),
        samples,
        song_length: song_length as usize,
        repeat_idx: repeat_idx as usize,
        order: order.to_vec(),
        magic: tag,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_header() -> Vec<u8> {
        let mut data = vec![0u8; PATTERNS_OFFSET];
        data[..9].copy_from_slice(b"test song");
        data[MAGIC_OFFSET..MAGIC_OFFSET + 4].copy_from_slice(b"M.K.");
        data
    }

    #[test]
    fn test_offsets_line_up() {
        assert_eq!(
            SAMPLE_TABLE_OFFSET + SAMPLE_COUNT * SAMPLE_ENTRY_SIZE,
            SONG_LENGTH_OFFSET
        );
        assert_eq!(ORDER_OFFSET + ORDER_SLOTS, MAGIC_OFFSET);
        assert_eq!(MAGIC_OFFSET + 4, PATTERNS_OFFSET);
    }

    #[test]
    fn test_parse_sample_entry() {
        let mut data = blank_header();
        let entry = SAMPLE_TABLE_OFFSET + SAMPLE_ENTRY_SIZE; // second sample
        data[entry..entry + 5].copy_from_slice(b"kick\0");
        data[entry + 22..entry + 24].copy_from_slice(&500u16.to_be_bytes());
        data[entry + 24] = 0xF9; // high nibble ignored, finetune 9
        data[entry + 25] = 48;
        data[entry + 26..entry + 28].copy_from_slice(&100u16.to_be_bytes());
        data[entry + 28..entry + 30].copy_from_slice(&50u16.to_be_bytes());

        let header = parse_header(&data).unwrap();
        let sample = &header.samples[1];
        assert_eq!(sample.name, "kick");
        assert_eq!(sample.length, 1000);
        assert_eq!(sample.finetune, 9);
        assert_eq!(sample.volume, 48);
        assert_eq!(sample.loop_start, 200);
        assert_eq!(sample.loop_length, 100);
    }

    #[test]
    fn test_parse_song_fields() {
        let mut data = blank_header();
        data[SONG_LENGTH_OFFSET] = 3;
        data[REPEAT_IDX_OFFSET] = 127;
        data[ORDER_OFFSET..ORDER_OFFSET + 4].copy_from_slice(&[0, 2, 1, 9]);

        let header = parse_header(&data).unwrap();
        assert_eq!(header.name, "test song");
        assert_eq!(header.samples.len(), SAMPLE_COUNT);
        assert_eq!(header.song_length, 3);
        assert_eq!(header.repeat_idx, 127);
        assert_eq!(header.play_order(), vec![0, 2, 1]);
        // slot 3 lies past the song length and does not count
        assert_eq!(header.pattern_count(), 3);
        assert_eq!(&header.magic, b"M.K.");
    }

    #[test]
    fn test_too_short() {
        let data = vec![0u8; PATTERNS_OFFSET - 1];
        assert!(matches!(
            parse_header(&data),
            Err(FormatError::TooShort { what: "header", .. })
        ));
    }

    #[test]
    fn test_decode_text_drops_nul() {
        assert_eq!(decode_text(b"ab\0\0cd\0"), "abcd");
    }
}
