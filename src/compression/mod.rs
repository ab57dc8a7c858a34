//! LHA/LZH unpacking for archived modules
//!
//! Module collections are often distributed as single-file LHA archives. The
//! loader calls [`decompress_if_needed`] before decoding, so packed and plain
//! files load the same way. Plain data passes through unchanged.

use std::io::{Read, Write};

use crate::error::{ModError, Result};

/// Bytes from the start of the file searched for the method tag.
///
/// Level 0/1 headers put `-lh?-` at offset 2, level 2 headers can push it up to
/// offset 25.
const LHA_SEARCH_LIMIT: usize = 40;

/// Length of the `-lh?-` method tag
const LHA_SIGNATURE_LENGTH: usize = 5;

/// Upper bound on unpacked size. Modules rarely exceed a few MB.
const MAX_DECOMPRESSED_SIZE: usize = 64 * 1024 * 1024;

const LHA_MIN_VALID_LEVEL: u8 = b'0';
const LHA_MAX_VALID_LEVEL: u8 = b'7';

/// Return the first archived file if `data` is an LHA archive, otherwise a copy of `data`.
pub fn decompress_if_needed(data: &[u8]) -> Result<Vec<u8>> {
    let level = match find_lha_signature(data) {
        Some(offset) => data[offset + 3] as char,
        None => return Ok(data.to_vec()),
    };

    tracing::debug!(level = %level, packed = data.len(), "unpacking LHA archive");

    let mut temp_file = tempfile::NamedTempFile::new().map_err(|e| {
        ModError::DecompressionError(format!("Failed to create temporary file: {}", e))
    })?;
    temp_file
        .write_all(data)
        .and_then(|_| temp_file.flush())
        .map_err(|e| {
            ModError::DecompressionError(format!(
                "Failed to write {} packed bytes to temporary file: {}",
                data.len(),
                e
            ))
        })?;

    let reader = delharc::parse_file(temp_file.path()).map_err(|e| {
        ModError::DecompressionError(format!("Failed to parse LHA archive: {}", e))
    })?;

    let mut unpacked = Vec::new();
    reader
        .take(MAX_DECOMPRESSED_SIZE as u64)
        .read_to_end(&mut unpacked)
        .map_err(|e| ModError::DecompressionError(format!("LHA decompression failed: {}", e)))?;

    if unpacked.len() >= MAX_DECOMPRESSED_SIZE {
        return Err(ModError::DecompressionError(
            "Unpacked data exceeded the 64MB limit".to_string(),
        ));
    }

    tracing::debug!(unpacked = unpacked.len(), "LHA archive unpacked");
    Ok(unpacked)
}

/// Offset of a `-lh[0-7]-` method tag near the start of `data`.
fn find_lha_signature(data: &[u8]) -> Option<usize> {
    if data.len() < LHA_SIGNATURE_LENGTH + 2 {
        return None;
    }

    let search_limit = LHA_SEARCH_LIMIT.min(data.len() - LHA_SIGNATURE_LENGTH);
    (1..=search_limit).find(|&i| {
        matches!(
            data.get(i..i + LHA_SIGNATURE_LENGTH),
            Some([b'-', b'l', b'h', level, b'-']) if is_valid_compression_level(*level)
        )
    })
}

#[inline]
fn is_valid_compression_level(byte: u8) -> bool {
    (LHA_MIN_VALID_LEVEL..=LHA_MAX_VALID_LEVEL).contains(&byte)
}

/// True if `data` carries an LHA method tag.
pub fn is_lha_compressed(data: &[u8]) -> bool {
    find_lha_signature(data).is_some()
}

/// Short description of the archive method, e.g. `"LH5 compressed (LHA/LZH archive)"`.
pub fn get_lha_info(data: &[u8]) -> Option<String> {
    find_lha_signature(data)
        .map(|offset| format!("LH{} compressed (LHA/LZH archive)", data[offset + 3] as char))
}
