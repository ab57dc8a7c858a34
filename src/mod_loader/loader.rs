//! Module file loader
//!
//! Loads module files with transparent LHA decompression.

use std::fs;
use std::path::Path;

use crate::mod_parser::{FormatParser, ModParser};
use crate::song::Song;
use crate::{compression, ModError, Result};

/// Loads modules from disk
pub struct ModFileLoader;

impl ModFileLoader {
    /// Read, unpack and decode a module file.
    pub fn load(path: impl AsRef<Path>) -> Result<Song> {
        let path = path.as_ref();
        let file_data = fs::read(path).map_err(|e| {
            ModError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read file '{}': {}", path.display(), e),
            ))
        })?;

        let song = Self::load_bytes(&file_data)?;
        tracing::info!(
            path = %path.display(),
            name = %song.name(),
            length = song.length(),
            "loaded module"
        );
        Ok(song)
    }

    /// Unpack (if needed) and decode a module held in memory.
    pub fn load_bytes(data: &[u8]) -> Result<Song> {
        if let Some(info) = compression::get_lha_info(data) {
            tracing::debug!(%info, "module is packed");
        }
        let data = compression::decompress_if_needed(data)?;
        let parser = ModParser::new();
        parser.parse(&data).map_err(ModError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormatError;

    #[test]
    fn test_missing_file() {
        let err = ModFileLoader::load("/nonexistent/dir/song.mod").unwrap_err();
        assert!(matches!(err, ModError::Io(_)));
        assert!(err.to_string().contains("song.mod"));
    }

    #[test]
    fn test_short_file_is_format_error() {
        let err = ModFileLoader::load_bytes(b"M.K.").unwrap_err();
        assert!(matches!(
            err,
            ModError::Format(FormatError::TooShort { .. })
        ));
    }

    #[test]
    fn test_load_from_disk() {
        use crate::mod_parser::header::{
            MAGIC_OFFSET, ORDER_OFFSET, PATTERNS_OFFSET, SONG_LENGTH_OFFSET,
        };
        use crate::mod_parser::PATTERN_SIZE;
        use std::io::Write;

        let mut data = vec![0u8; PATTERNS_OFFSET + PATTERN_SIZE];
        data[..5].copy_from_slice(b"ondsk");
        data[SONG_LENGTH_OFFSET] = 1;
        data[ORDER_OFFSET] = 0;
        data[MAGIC_OFFSET..MAGIC_OFFSET + 4].copy_from_slice(b"FLT4");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&data).unwrap();
        file.flush().unwrap();

        let song = crate::mod_loader::load_file(file.path()).unwrap();
        assert_eq!(song.name(), "ondsk");
        assert_eq!(song.length(), 1);
    }
}
