//! Module format parsing
//!
//! Decodes the 4-channel, 31-sample tracker layout into a [`Song`].
//!
//! Order of operations matters: the pattern count is derived from the play order,
//! and sample data starts right after the last pattern, so the header must be read
//! before patterns, and patterns before samples.

pub mod bits;
pub mod effects;
pub mod header;
pub mod pattern;

pub use bits::extract_bits;
pub use effects::decode_effect;
pub use header::{parse_header, ModuleHeader, SampleHeader};
pub use pattern::{decode_note, decode_patterns, PATTERN_SIZE};

use crate::error::FormatError;
use crate::song::{FormatVariant, Sample, Song};
use header::{ORDER_SLOTS, PATTERNS_OFFSET};

/// Trait for module format parsers
pub trait FormatParser {
    /// Decode a complete module
    fn parse(&self, data: &[u8]) -> Result<Song, FormatError>;

    /// Parser name
    fn name(&self) -> &str;
}

/// Parser for the M.K. family of 4-channel modules
pub struct ModParser;

impl ModParser {
    /// Create a new parser
    pub fn new() -> Self {
        ModParser
    }

    /// Identify the layout from the 4-byte tag at 0x0438.
    pub fn detect_variant(magic: &[u8; 4]) -> Result<FormatVariant, FormatError> {
        match magic {
            b"M.K." => Ok(FormatVariant::ProTracker),
            b"M!K!" => Ok(FormatVariant::ProTrackerExtended),
            b"4CHN" => Ok(FormatVariant::FourChannel),
            b"FLT4" => Ok(FormatVariant::StarTrekker),
            b"6CHN" | b"8CHN" | b"FLT8" | b"CD81" | b"OKTA" | b"OCTA" => Err(
                FormatError::UnsupportedVariant(String::from_utf8_lossy(magic).into_owned()),
            ),
            [d0, d1, b'C', b'H'] if d0.is_ascii_digit() && d1.is_ascii_digit() => Err(
                FormatError::UnsupportedVariant(String::from_utf8_lossy(magic).into_owned()),
            ),
            _ => Err(FormatError::UnknownMagic(*magic)),
        }
    }

    /// Read every sample body, in table order, from `offset` onwards.
    ///
    /// Files whose last samples are cut short are common; a short body is kept as far
    /// as it goes rather than failing the whole load.
    fn read_samples(data: &[u8], offset: usize, headers: &[SampleHeader]) -> Vec<Sample> {
        let mut cursor = offset;
        headers
            .iter()
            .enumerate()
            .map(|(idx, header)| {
                let start = cursor.min(data.len());
                let end = cursor.saturating_add(header.length).min(data.len());
                cursor = cursor.saturating_add(header.length);

                if end - start < header.length {
                    tracing::warn!(
                        sample = idx,
                        expected = header.length,
                        available = end - start,
                        "sample data truncated"
                    );
                }

                let body = data[start..end].iter().map(|&b| to_f32(b)).collect();
                Sample::new(
                    header.name.clone(),
                    header.finetune,
                    header.volume,
                    header.loop_start,
                    header.loop_length,
                    body,
                )
            })
            .collect()
    }
}

impl Default for ModParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatParser for ModParser {
    fn parse(&self, data: &[u8]) -> Result<Song, FormatError> {
        let header = parse_header(data)?;
        let variant = Self::detect_variant(&header.magic)?;

        if header.song_length == 0 {
            return Err(FormatError::EmptyPlayOrder);
        }
        if header.song_length > ORDER_SLOTS {
            return Err(FormatError::SongTooLong(header.song_length));
        }

        let pattern_count = header.pattern_count();
        let sample_count = variant.sample_count();
        let patterns = decode_patterns(data, pattern_count, sample_count)?;

        let sample_offset = PATTERNS_OFFSET + pattern_count * PATTERN_SIZE;
        let samples = Self::read_samples(data, sample_offset, &header.samples);

        tracing::debug!(
            name = %header.name,
            length = header.song_length,
            patterns = pattern_count,
            sample_bytes = header.sample_data_len(),
            "decoded module"
        );

        Song::new(
            header.name.clone(),
            variant,
            header.repeat_idx,
            header.play_order(),
            patterns,
            samples,
        )
    }

    fn name(&self) -> &str {
        "4-channel MOD"
    }
}

/// Convert a signed 8-bit sample byte to [-1, 1).
#[inline]
fn to_f32(byte: u8) -> f32 {
    f32::from(byte as i8) / 128.0
}

/// Decode a module held in memory.
pub fn decode(data: &[u8]) -> Result<Song, FormatError> {
    ModParser.parse(data)
}
