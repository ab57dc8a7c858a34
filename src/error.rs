//! Error types for module decoding and playback
//!
//! Decoding failures ([`FormatError`]) are fatal and abort the load. Everything that can go
//! wrong while the render pipeline is running is either recovered locally ([`IndexError`],
//! [`BackpressureError`]) or shuts the pipeline down ([`SyncError::Broken`]).

use std::time::Duration;

/// Error type for all crate operations
#[derive(thiserror::Error, Debug)]
pub enum ModError {
    /// The module file could not be decoded
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// IO error from filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Decompression error (LHA/LZH)
    #[error("Decompression error: {0}")]
    DecompressionError(String),

    /// Audio device error
    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// The tick barrier failed
    #[error("Synchronization failure: {0}")]
    Sync(#[from] SyncError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for ModError {
    fn from(msg: String) -> Self {
        ModError::Other(msg)
    }
}

impl From<&str> for ModError {
    fn from(msg: &str) -> Self {
        ModError::Other(msg.to_string())
    }
}

/// Result type for crate operations
pub type Result<T> = std::result::Result<T, ModError>;

/// Fatal decoder errors. No partial song is ever returned alongside one of these.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The byte stream ends before a required field
    #[error("file too short: need {needed} bytes for {what}, got {actual}")]
    TooShort {
        /// Field or block being read
        what: &'static str,
        /// Bytes required from the start of the file
        needed: usize,
        /// Bytes available
        actual: usize,
    },

    /// The 4-byte tag at 0x0438 is not a known module signature
    #[error("unrecognized format tag {0:?}")]
    UnknownMagic([u8; 4]),

    /// The tag names a known layout this decoder does not handle
    #[error("unsupported format variant '{0}' (only 4-channel, 31-sample modules are supported)")]
    UnsupportedVariant(String),

    /// A bit-range query fell outside the word or was inverted
    #[error("bit range [{start}, {end}] invalid for a {bits}-bit word")]
    BitRange {
        /// First bit (inclusive, 0 = MSB of first byte)
        start: u32,
        /// Last bit (inclusive)
        end: u32,
        /// Width of the queried word in bits
        bits: usize,
    },

    /// The song length is zero, so there is no pattern to play
    #[error("song has an empty play order")]
    EmptyPlayOrder,

    /// The song length exceeds the 128 available play-order slots
    #[error("song length {0} exceeds the 128 play-order slots")]
    SongTooLong(usize),

    /// The play order names a pattern that was not decoded
    #[error("play order references pattern {pattern} but only {count} patterns exist")]
    PatternOutOfRange {
        /// Referenced pattern index
        pattern: usize,
        /// Number of decoded patterns
        count: usize,
    },

    /// Header bytes did not parse
    #[error("malformed header: {0}")]
    Header(String),
}

/// A note references a pattern, row or sample slot that does not exist in the song.
///
/// Recovered at render time: the channel outputs silence for the tick.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexError {
    /// Play-order position outside the song
    #[error("play position {0} is outside the play order")]
    Position(usize),
    /// Pattern index outside the pattern list
    #[error("pattern {0} does not exist")]
    Pattern(usize),
    /// Row index outside the pattern
    #[error("row {0} does not exist")]
    Row(usize),
    /// Sample index outside the sample list
    #[error("sample {0} does not exist")]
    Sample(usize),
}

/// The sink could not take a mixed frame in time; the frame is dropped.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackpressureError {
    /// The hand-off queue stayed full past the timeout
    #[error("sink queue full for {0:?}, frame dropped")]
    Timeout(Duration),
    /// The sink side of the hand-off has gone away
    #[error("sink disconnected, frame dropped")]
    Disconnected,
}

/// Tick barrier failures.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    /// A participant died without arriving; lock-step can no longer be guaranteed
    #[error("tick barrier broken: a participant failed to arrive")]
    Broken,
    /// The cooperative stop flag was raised
    #[error("playback cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_converts() {
        let err: ModError = FormatError::EmptyPlayOrder.into();
        assert!(matches!(err, ModError::Format(FormatError::EmptyPlayOrder)));
        assert!(err.to_string().contains("empty play order"));
    }

    #[test]
    fn test_unknown_magic_message() {
        let err = FormatError::UnknownMagic(*b"ABCD");
        assert!(err.to_string().contains("unrecognized format tag"));
    }

    #[test]
    fn test_string_conversion() {
        let err: ModError = "boom".into();
        assert_eq!(err.to_string(), "boom");
    }
}
