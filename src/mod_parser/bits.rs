//! Big-endian bit-field extraction
//!
//! Bit 0 is the most significant bit of the first byte; ranges are inclusive.

use crate::error::FormatError;

/// Extract the unsigned integer stored in bits `[start, end]` of `data`.
///
/// Fails if `data` is empty, if either bound lies outside `[0, 8 * data.len())`,
/// if `start > end`, or if the field is wider than 64 bits.
pub fn extract_bits(data: &[u8], start: u32, end: u32) -> Result<u64, FormatError> {
    let bits = data.len() * 8;
    let invalid = FormatError::BitRange { start, end, bits };

    if bits == 0 || start > end || end as usize >= bits || end - start >= 64 {
        return Err(invalid);
    }

    let first_byte = start as usize / 8;
    let last_byte = end as usize / 8;

    // Gather the covering bytes into a wide accumulator, then shift the field down.
    let mut acc: u128 = 0;
    for &byte in &data[first_byte..=last_byte] {
        acc = (acc << 8) | u128::from(byte);
    }
    let trailing = last_byte * 8 + 7 - end as usize;
    let width = end - start + 1;
    let mask: u128 = (1u128 << width) - 1;

    Ok(((acc >> trailing) & mask) as u64)
}

/// Extract a field that is known to fit in 16 bits.
pub fn extract_u16(data: &[u8], start: u32, end: u32) -> Result<u16, FormatError> {
    debug_assert!(end >= start && end - start < 16);
    extract_bits(data, start, end).map(|value| value as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORD: [u8; 4] = [0x12, 0x34, 0xAB, 0xCD];

    #[test]
    fn test_nibbles_of_word() {
        assert_eq!(extract_bits(&WORD, 0, 3).unwrap(), 0x1);
        assert_eq!(extract_bits(&WORD, 4, 7).unwrap(), 0x2);
        assert_eq!(extract_bits(&WORD, 20, 31).unwrap(), 0xBCD);
        assert_eq!(extract_bits(&WORD, 4, 15).unwrap(), 0x234);
        assert_eq!(extract_bits(&WORD, 16, 19).unwrap(), 0xA);
    }

    #[test]
    fn test_whole_word() {
        assert_eq!(extract_bits(&WORD, 0, 31).unwrap(), 0x1234_ABCD);
    }

    #[test]
    fn test_single_bits() {
        let data = [0b1000_0001];
        assert_eq!(extract_bits(&data, 0, 0).unwrap(), 1);
        assert_eq!(extract_bits(&data, 1, 6).unwrap(), 0);
        assert_eq!(extract_bits(&data, 7, 7).unwrap(), 1);
    }

    #[test]
    fn test_unaligned_span() {
        // 0x12 0x34 -> 0001 0010 0011 0100; bits 3..=10 = 1 0010 001 = 0x91
        assert_eq!(extract_bits(&WORD, 3, 10).unwrap(), 0x91);
    }

    #[test]
    fn test_long_input() {
        let data = [0xFFu8; 12];
        assert_eq!(extract_bits(&data, 32, 95).unwrap(), u64::MAX);
        assert_eq!(extract_bits(&data, 90, 95).unwrap(), 0x3F);
    }

    #[test]
    fn test_out_of_range() {
        assert!(extract_bits(&WORD, 0, 32).is_err());
        assert!(extract_bits(&WORD, 32, 32).is_err());
        assert!(extract_bits(&WORD, 5, 4).is_err());
        assert!(extract_bits(&[], 0, 0).is_err());
        assert!(extract_bits(&[0u8; 10], 0, 64).is_err());
    }

    #[test]
    fn test_error_reports_range() {
        let err = extract_bits(&WORD, 8, 40).unwrap_err();
        assert_eq!(
            err,
            FormatError::BitRange {
                start: 8,
                end: 40,
                bits: 32
            }
        );
    }
}
