//! Decoded module data
//!
//! Passive values produced by [`crate::mod_parser`] and read by the replayer.
//! A [`Song`] is immutable once built; every constructor checks the invariants
//! the renderer relies on.

pub mod effect;

use std::fmt;

pub use effect::{Arity, Effect, EffectId};

use crate::error::FormatError;

/// Number of channels in a pattern
pub const CHANNEL_COUNT: usize = 4;

/// Rows (notes) per channel in a pattern
pub const ROWS_PER_PATTERN: usize = 64;

/// Loop length (in frames) at or below which a sample does not loop
pub const NO_LOOP: usize = 2;

/// One pattern cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Note {
    /// 0-based sample to trigger; `None` continues whatever the channel is playing
    pub sample: Option<usize>,
    /// Pitch period (smaller is higher)
    pub period: u16,
    /// Effect command for this row
    pub effect: Effect,
}

impl Note {
    /// A cell that neither triggers nor changes anything.
    pub const EMPTY: Note = Note {
        sample: None,
        period: 0,
        effect: Effect::Arpeggio { x: 0, y: 0 },
    };

    /// A cell that triggers `sample` at `period`.
    pub fn trigger(sample: usize, period: u16) -> Self {
        Note {
            sample: Some(sample),
            period,
            effect: Effect::default(),
        }
    }

    /// True if this cell keeps the channel's current sample playing.
    pub fn is_continue(&self) -> bool {
        self.sample.is_none()
    }
}

/// Four channels of 64 rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    channels: [[Note; ROWS_PER_PATTERN]; CHANNEL_COUNT],
}

impl Default for Pattern {
    fn default() -> Self {
        Pattern {
            channels: [[Note::EMPTY; ROWS_PER_PATTERN]; CHANNEL_COUNT],
        }
    }
}

impl Pattern {
    /// Rows of one channel.
    pub fn channel(&self, channel: usize) -> Option<&[Note; ROWS_PER_PATTERN]> {
        self.channels.get(channel)
    }

    /// A single cell.
    pub fn note(&self, channel: usize, row: usize) -> Option<&Note> {
        self.channels.get(channel).and_then(|rows| rows.get(row))
    }

    /// Overwrite a single cell. Out-of-range coordinates are ignored.
    pub fn set_note(&mut self, channel: usize, row: usize, note: Note) {
        if let Some(cell) = self.channels.get_mut(channel).and_then(|rows| rows.get_mut(row)) {
            *cell = note;
        }
    }
}

impl std::ops::Index<usize> for Pattern {
    type Output = [Note; ROWS_PER_PATTERN];

    fn index(&self, channel: usize) -> &Self::Output {
        &self.channels[channel]
    }
}

/// Loop region of a waveform, in frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopRegion {
    /// First frame of the loop
    pub start: usize,
    /// Loop length in frames (always > 0)
    pub length: usize,
}

impl LoopRegion {
    /// One past the last frame of the loop.
    pub fn end(&self) -> usize {
        self.start + self.length
    }
}

/// A sample recording plus its playback parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    name: String,
    finetune: u8,
    volume: u8,
    loop_start: usize,
    loop_length: usize,
    has_loop: bool,
    data: Vec<f32>,
}

impl Sample {
    /// Build a sample from normalized waveform data.
    ///
    /// `finetune` keeps only its low nibble. A loop that runs past the data is clipped
    /// to it; a loop of [`NO_LOOP`] frames or less disables looping.
    pub fn new(
        name: impl Into<String>,
        finetune: u8,
        volume: u8,
        loop_start: usize,
        loop_length: usize,
        data: Vec<f32>,
    ) -> Self {
        let length = data.len();
        let loop_start = loop_start.min(length);
        let loop_length = loop_length.min(length - loop_start);
        Sample {
            name: name.into(),
            finetune: finetune & 0x0F,
            volume,
            loop_start,
            loop_length,
            has_loop: loop_length > NO_LOOP,
            data,
        }
    }

    /// An unused sample slot.
    pub fn empty() -> Self {
        Sample::new("", 0, 0, 0, 0, Vec::new())
    }

    /// Sample name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Length in frames
    pub fn length(&self) -> usize {
        self.data.len()
    }

    /// Raw 4-bit finetune field
    pub fn finetune(&self) -> u8 {
        self.finetune
    }

    /// Finetune in semitone units: raw 8-15 map to -8..-1.
    pub fn signed_finetune(&self) -> i8 {
        let raw = self.finetune as i8;
        if raw >= 8 {
            raw - 16
        } else {
            raw
        }
    }

    /// Default volume (0-64)
    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Loop start in frames
    pub fn loop_start(&self) -> usize {
        self.loop_start
    }

    /// Loop length in frames
    pub fn loop_length(&self) -> usize {
        self.loop_length
    }

    /// Whether playback wraps into the loop region
    pub fn has_loop(&self) -> bool {
        self.has_loop
    }

    /// The loop region, if the sample loops.
    pub fn loop_region(&self) -> Option<LoopRegion> {
        self.has_loop.then_some(LoopRegion {
            start: self.loop_start,
            length: self.loop_length,
        })
    }

    /// Normalized waveform in [-1, 1)
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// True if the slot holds no audio.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Tag-identified layout variants of the module format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatVariant {
    /// `M.K.` - ProTracker
    ProTracker,
    /// `M!K!` - ProTracker, more than 64 patterns
    ProTrackerExtended,
    /// `4CHN` - FastTracker 4-channel
    FourChannel,
    /// `FLT4` - StarTrekker 4-channel
    StarTrekker,
}

impl FormatVariant {
    /// The 4-byte tag stored at 0x0438.
    pub fn magic(&self) -> &'static [u8; 4] {
        match self {
            FormatVariant::ProTracker => b"M.K.",
            FormatVariant::ProTrackerExtended => b"M!K!",
            FormatVariant::FourChannel => b"4CHN",
            FormatVariant::StarTrekker => b"FLT4",
        }
    }

    /// Number of sample table entries
    pub fn sample_count(&self) -> usize {
        31
    }

    /// Number of channels per pattern
    pub fn channel_count(&self) -> usize {
        CHANNEL_COUNT
    }
}

/// A fully decoded module.
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    name: String,
    variant: FormatVariant,
    repeat_idx: usize,
    pattern_order: Vec<usize>,
    patterns: Vec<Pattern>,
    samples: Vec<Sample>,
}

impl Song {
    /// Assemble a song, checking that the play order only names existing patterns.
    ///
    /// The song length is the play order's length. `repeat_idx` is clamped to it.
    pub fn new(
        name: impl Into<String>,
        variant: FormatVariant,
        repeat_idx: usize,
        pattern_order: Vec<usize>,
        patterns: Vec<Pattern>,
        samples: Vec<Sample>,
    ) -> Result<Self, FormatError> {
        if pattern_order.is_empty() {
            return Err(FormatError::EmptyPlayOrder);
        }
        if pattern_order.len() > 128 {
            return Err(FormatError::SongTooLong(pattern_order.len()));
        }
        if let Some(&bad) = pattern_order.iter().find(|&&p| p >= patterns.len()) {
            return Err(FormatError::PatternOutOfRange {
                pattern: bad,
                count: patterns.len(),
            });
        }

        let repeat_idx = repeat_idx.min(pattern_order.len());
        Ok(Song {
            name: name.into(),
            variant,
            repeat_idx,
            pattern_order,
            patterns,
            samples,
        })
    }

    /// Song name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Format variant the song was decoded from
    pub fn variant(&self) -> FormatVariant {
        self.variant
    }

    /// Number of play-order positions
    pub fn length(&self) -> usize {
        self.pattern_order.len()
    }

    /// Loop-back position
    pub fn repeat_idx(&self) -> usize {
        self.repeat_idx
    }

    /// Play position -> pattern index
    pub fn pattern_order(&self) -> &[usize] {
        &self.pattern_order
    }

    /// Patterns in storage order
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Sample table (31 entries for decoded files)
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of play positions the cursor cycles through.
    ///
    /// `min(length, repeat_idx)`, except that a repeat index of 0 means the whole song.
    pub fn play_bound(&self) -> usize {
        match self.repeat_idx {
            0 => self.length(),
            repeat => repeat.min(self.length()),
        }
    }

    /// Pattern playing at a play position.
    pub fn pattern_at(&self, position: usize) -> Option<&Pattern> {
        self.pattern_order
            .get(position)
            .and_then(|&idx| self.patterns.get(idx))
    }
}

impl fmt::Display for Song {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "---- SONG INFO ----")?;
        writeln!(f, "Name: {}", self.name)?;
        writeln!(f, "Format: {}", String::from_utf8_lossy(self.variant.magic()))?;
        writeln!(f, "Sample list:")?;
        for (idx, sample) in self.samples.iter().enumerate() {
            let name = if sample.name().is_empty() {
                "[null]"
            } else {
                sample.name()
            };
            writeln!(f, "\t{:2}: {} ({} frames)", idx + 1, name, sample.length())?;
        }
        writeln!(f, "Length: {}", self.length())?;
        writeln!(f, "Repeat index: {}", self.repeat_idx)?;
        write!(f, "Pattern order: {:?}", self.pattern_order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_pattern_song() -> Song {
        Song::new(
            "test",
            FormatVariant::ProTracker,
            2,
            vec![0, 1],
            vec![Pattern::default(), Pattern::default()],
            vec![Sample::empty()],
        )
        .unwrap()
    }

    #[test]
    fn test_signed_finetune_mapping() {
        let cases = [(0u8, 0i8), (7, 7), (8, -8), (15, -1), (0x1F, -1)];
        for (raw, expected) in cases {
            let sample = Sample::new("", raw, 64, 0, 0, vec![0.0; 4]);
            assert_eq!(sample.signed_finetune(), expected, "raw {raw}");
        }
    }

    #[test]
    fn test_loop_threshold() {
        let data = vec![0.0; 100];
        assert!(!Sample::new("", 0, 64, 0, 2, data.clone()).has_loop());
        assert!(Sample::new("", 0, 64, 10, 3, data.clone()).has_loop());
        assert_eq!(
            Sample::new("", 0, 64, 10, 20, data).loop_region(),
            Some(LoopRegion { start: 10, length: 20 })
        );
    }

    #[test]
    fn test_loop_clipped_to_data() {
        let sample = Sample::new("", 0, 64, 90, 50, vec![0.0; 100]);
        assert_eq!(sample.loop_start(), 90);
        assert_eq!(sample.loop_length(), 10);
        assert!(sample.loop_start() + sample.loop_length() <= sample.length());
    }

    #[test]
    fn test_song_rejects_dangling_order() {
        let result = Song::new(
            "bad",
            FormatVariant::ProTracker,
            0,
            vec![0, 3],
            vec![Pattern::default()],
            Vec::new(),
        );
        assert_eq!(
            result.unwrap_err(),
            FormatError::PatternOutOfRange {
                pattern: 3,
                count: 1
            }
        );
    }

    #[test]
    fn test_song_rejects_empty_order() {
        let result = Song::new("", FormatVariant::ProTracker, 0, vec![], vec![], vec![]);
        assert_eq!(result.unwrap_err(), FormatError::EmptyPlayOrder);
    }

    #[test]
    fn test_play_bound() {
        let song = two_pattern_song();
        assert_eq!(song.play_bound(), 2);

        let clamped = Song::new(
            "",
            FormatVariant::ProTracker,
            127,
            vec![0, 0, 0],
            vec![Pattern::default()],
            vec![],
        )
        .unwrap();
        assert_eq!(clamped.repeat_idx(), 3);
        assert_eq!(clamped.play_bound(), 3);

        let zero = Song::new(
            "",
            FormatVariant::ProTracker,
            0,
            vec![0, 0],
            vec![Pattern::default()],
            vec![],
        )
        .unwrap();
        assert_eq!(zero.play_bound(), 2);
    }

    #[test]
    fn test_pattern_indexing() {
        let mut pattern = Pattern::default();
        pattern.set_note(2, 5, Note::trigger(3, 214));
        assert_eq!(pattern[2][5].sample, Some(3));
        assert_eq!(pattern.note(2, 5).map(|n| n.period), Some(214));
        assert!(pattern.note(4, 0).is_none());
        assert!(pattern.note(0, 64).is_none());
        pattern.set_note(9, 0, Note::trigger(0, 1));
    }

    #[test]
    fn test_display_lists_samples() {
        let song = two_pattern_song();
        let text = song.to_string();
        assert!(text.contains("Name: test"));
        assert!(text.contains("[null]"));
        assert!(text.contains("Pattern order: [0, 1]"));
    }
}
