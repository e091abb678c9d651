//! Static DEFLATE tables (RFC 1951).
//!
//! Fixed Huffman code lengths, the length and distance base/extra-bit
//! tables, and the permutation used for code-length code lengths in
//! dynamic block headers. The two fixed Huffman tables are built once per
//! process and shared by reference.

use crate::huffman::HuffmanTable;
use std::sync::OnceLock;
use streamarc_core::error::Result;

/// Fixed literal/length code lengths (RFC 1951 Section 3.2.6).
///
/// - Symbols 0-143: 8 bits
/// - Symbols 144-255: 9 bits
/// - Symbols 256-279: 7 bits
/// - Symbols 280-287: 8 bits
pub fn fixed_litlen_lengths() -> [u8; 288] {
    let mut lengths = [8u8; 288];
    lengths[144..256].fill(9);
    lengths[256..280].fill(7);
    lengths
}

/// Fixed distance code lengths.
///
/// All 32 codes use 5 bits; symbols 30 and 31 never occur in valid data.
pub fn fixed_distance_lengths() -> [u8; 32] {
    [5u8; 32]
}

fn cached(
    cell: &'static OnceLock<HuffmanTable>,
    lengths: &[u8],
) -> Result<&'static HuffmanTable> {
    if let Some(table) = cell.get() {
        return Ok(table);
    }
    let table = HuffmanTable::from_code_lengths(lengths)?;
    // A racing initialiser built the same table; either copy is fine.
    Ok(cell.get_or_init(|| table))
}

/// The fixed literal/length table, built on first use.
pub fn fixed_litlen_table() -> Result<&'static HuffmanTable> {
    static TABLE: OnceLock<HuffmanTable> = OnceLock::new();
    cached(&TABLE, &fixed_litlen_lengths())
}

/// The fixed distance table, built on first use.
pub fn fixed_distance_table() -> Result<&'static HuffmanTable> {
    static TABLE: OnceLock<HuffmanTable> = OnceLock::new();
    cached(&TABLE, &fixed_distance_lengths())
}

/// Length code base values (RFC 1951 Section 3.2.5).
///
/// For length codes 257-285, this gives the base length value.
/// Extra bits are added to get the final length.
pub const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, // 257-264
    11, 13, 15, 17, // 265-268
    19, 23, 27, 31, // 269-272
    35, 43, 51, 59, // 273-276
    67, 83, 99, 115, // 277-280
    131, 163, 195, 227, // 281-284
    258, // 285
];

/// Number of extra bits for length codes 257-285.
pub const LENGTH_EXTRA_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, // 257-264
    1, 1, 1, 1, // 265-268
    2, 2, 2, 2, // 269-272
    3, 3, 3, 3, // 273-276
    4, 4, 4, 4, // 277-280
    5, 5, 5, 5, // 281-284
    0, // 285
];

/// Distance code base values (RFC 1951 Section 3.2.5).
pub const DISTANCE_BASE: [u16; 30] = [
    1, 2, 3, 4, // 0-3
    5, 7, // 4-5
    9, 13, // 6-7
    17, 25, // 8-9
    33, 49, // 10-11
    65, 97, // 12-13
    129, 193, // 14-15
    257, 385, // 16-17
    513, 769, // 18-19
    1025, 1537, // 20-21
    2049, 3073, // 22-23
    4097, 6145, // 24-25
    8193, 12289, // 26-27
    16385, 24577, // 28-29
];

/// Number of extra bits for distance codes 0-29.
pub const DISTANCE_EXTRA_BITS: [u8; 30] = [
    0, 0, 0, 0, // 0-3
    1, 1, // 4-5
    2, 2, // 6-7
    3, 3, // 8-9
    4, 4, // 10-11
    5, 5, // 12-13
    6, 6, // 14-15
    7, 7, // 16-17
    8, 8, // 18-19
    9, 9, // 20-21
    10, 10, // 22-23
    11, 11, // 24-25
    12, 12, // 26-27
    13, 13, // 28-29
];

/// Order of code length codes in dynamic block header (RFC 1951 Section 3.2.7).
pub const CODE_LENGTH_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Base length and extra-bit count for a length symbol (257-285).
pub fn length_code(symbol: u16) -> Option<(u16, u8)> {
    let i = usize::from(symbol).checked_sub(257)?;
    Some((*LENGTH_BASE.get(i)?, LENGTH_EXTRA_BITS[i]))
}

/// Base distance and extra-bit count for a distance symbol (0-29).
pub fn distance_code(symbol: u16) -> Option<(u16, u8)> {
    let i = usize::from(symbol);
    Some((*DISTANCE_BASE.get(i)?, DISTANCE_EXTRA_BITS[i]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_litlen_lengths() {
        let lengths = fixed_litlen_lengths();
        assert_eq!(lengths[0], 8);
        assert_eq!(lengths[143], 8);
        assert_eq!(lengths[144], 9);
        assert_eq!(lengths[255], 9);
        assert_eq!(lengths[256], 7);
        assert_eq!(lengths[279], 7);
        assert_eq!(lengths[280], 8);
        assert_eq!(lengths[287], 8);
    }

    #[test]
    fn test_fixed_distance_lengths() {
        let lengths = fixed_distance_lengths();
        assert_eq!(lengths.len(), 32);
        assert!(lengths.iter().all(|&l| l == 5));
    }

    #[test]
    fn test_fixed_litlen_canonical_codes() {
        let table = fixed_litlen_table().unwrap();
        // RFC 1951 §3.2.6 code ranges
        assert_eq!(table.lookup(0b0011_0000, 8), Some(0));
        assert_eq!(table.lookup(0b1011_1111, 8), Some(143));
        assert_eq!(table.lookup(0b1_1001_0000, 9), Some(144));
        assert_eq!(table.lookup(0b1_1111_1111, 9), Some(255));
        assert_eq!(table.lookup(0b000_0000, 7), Some(256));
        assert_eq!(table.lookup(0b001_0111, 7), Some(279));
        assert_eq!(table.lookup(0b1100_0000, 8), Some(280));
        assert_eq!(table.lookup(0b1100_0111, 8), Some(287));
    }

    #[test]
    fn test_fixed_tables_are_cached() {
        let a = fixed_distance_table().unwrap();
        let b = fixed_distance_table().unwrap();
        assert!(std::ptr::eq(a, b));
        assert_eq!(a.lookup(29, 5), Some(29));
    }

    #[test]
    fn test_length_and_distance_codes() {
        assert_eq!(length_code(257), Some((3, 0)));
        assert_eq!(length_code(265), Some((11, 1)));
        assert_eq!(length_code(284), Some((227, 5)));
        assert_eq!(length_code(285), Some((258, 0)));
        assert_eq!(length_code(256), None);
        assert_eq!(length_code(286), None);

        assert_eq!(distance_code(0), Some((1, 0)));
        assert_eq!(distance_code(4), Some((5, 1)));
        assert_eq!(distance_code(29), Some((24577, 13)));
        assert_eq!(distance_code(30), None);
    }
}
