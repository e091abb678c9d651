//! Canonical Huffman tables for DEFLATE.
//!
//! A table is built from an array of per-symbol code lengths (RFC 1951
//! §3.2.2). Codes of the same length are assigned consecutive values in
//! increasing symbol order, so the length array alone determines every code.
//!
//! # Alphabets
//!
//! DEFLATE uses three Huffman alphabets:
//! - **Literal/Length**: 0-285 (0-255 literals, 256 EOB, 257-285 lengths)
//! - **Distance**: 0-29 (back-reference distances)
//! - **Code Length**: 0-18 (for encoding dynamic Huffman tables)
//!
//! # Decoding
//!
//! Codes are packed into the stream starting with their most significant
//! bit, even though the stream itself is LSB-first. [`HuffmanTable::decode`]
//! therefore reads one bit at a time and shifts each into the running code
//! from the right until the `(code, length)` pair names a symbol.

use streamarc_core::bitstream::BitStream;
use streamarc_core::error::{Result, StreamArcError};

/// Maximum code length in DEFLATE (15 bits).
pub const MAX_CODE_LENGTH: usize = 15;

/// Size of the literal/length alphabet (0-285).
pub const LITLEN_ALPHABET_SIZE: usize = 286;

/// Size of the distance alphabet (0-29).
pub const DISTANCE_ALPHABET_SIZE: usize = 30;

/// Size of the code length alphabet (0-18).
pub const CODELEN_ALPHABET_SIZE: usize = 19;

/// End of block symbol.
pub const END_OF_BLOCK: u16 = 256;

/// A canonical prefix-code table mapping `(code, length)` to a symbol.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    /// Longest code in the table, 0 for an empty table.
    max_code_length: usize,
    /// Number of codes of each length.
    counts: [u16; MAX_CODE_LENGTH + 1],
    /// Smallest code of each length.
    base_codes: [u32; MAX_CODE_LENGTH + 1],
    /// Index into `symbols` of the first symbol of each length.
    symbol_offsets: [u16; MAX_CODE_LENGTH + 1],
    /// Symbols sorted by (length, code).
    symbols: Vec<u16>,
}

impl HuffmanTable {
    /// Build a table from code lengths.
    ///
    /// `code_lengths[i]` is the bit length for symbol `i`; 0 means the
    /// symbol is unused. An all-zero array yields an empty table that
    /// rejects every decode. Lengths that over-subscribe the code space
    /// fail with [`StreamArcError::MalformedHuffman`]; an incomplete code is
    /// accepted, since DEFLATE allows e.g. a single distance code.
    pub fn from_code_lengths(code_lengths: &[u8]) -> Result<Self> {
        if code_lengths.is_empty() {
            return Err(StreamArcError::malformed_huffman("empty code length array"));
        }

        // Count codes of each length
        let mut bl_count = [0u32; MAX_CODE_LENGTH + 1];
        let mut max_length = 0usize;
        for &len in code_lengths {
            let len = len as usize;
            if len > MAX_CODE_LENGTH {
                return Err(StreamArcError::malformed_huffman(format!(
                    "code length {len} exceeds maximum {MAX_CODE_LENGTH}"
                )));
            }
            if len > 0 {
                bl_count[len] += 1;
                max_length = max_length.max(len);
            }
        }

        let mut table = Self {
            max_code_length: max_length,
            counts: [0; MAX_CODE_LENGTH + 1],
            base_codes: [0; MAX_CODE_LENGTH + 1],
            symbol_offsets: [0; MAX_CODE_LENGTH + 1],
            symbols: Vec::new(),
        };
        if max_length == 0 {
            return Ok(table);
        }

        // Smallest code for each length (RFC 1951 algorithm)
        let mut code = 0u32;
        for bits in 1..=max_length {
            code = (code + bl_count[bits - 1]) << 1;
            table.base_codes[bits] = code;
        }
        if code + bl_count[max_length] > 1u32 << max_length {
            return Err(StreamArcError::malformed_huffman(
                "over-subscribed code lengths",
            ));
        }

        let mut offset = 0u16;
        for bits in 1..=max_length {
            table.symbol_offsets[bits] = offset;
            table.counts[bits] = bl_count[bits] as u16;
            offset += bl_count[bits] as u16;
        }

        // Assign symbols in increasing order within each length class
        table.symbols = vec![0u16; offset as usize];
        let mut next_index = table.symbol_offsets;
        for (symbol, &len) in code_lengths.iter().enumerate() {
            if len > 0 {
                let slot = &mut next_index[len as usize];
                table.symbols[*slot as usize] = symbol as u16;
                *slot += 1;
            }
        }

        Ok(table)
    }

    /// Longest code length in the table (0 when empty).
    pub fn max_code_length(&self) -> usize {
        self.max_code_length
    }

    /// Whether the table holds no codes at all.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbol for the code `code` of `length` bits, if any.
    pub fn lookup(&self, code: u32, length: usize) -> Option<u16> {
        if length == 0 || length > self.max_code_length {
            return None;
        }
        let index = code.checked_sub(self.base_codes[length])?;
        if index >= u32::from(self.counts[length]) {
            return None;
        }
        Some(self.symbols[self.symbol_offsets[length] as usize + index as usize])
    }

    /// Decode one symbol, reading the code bit by bit.
    ///
    /// Fails with [`StreamArcError::UnexpectedEof`] when the stream ends
    /// mid-code and with [`StreamArcError::InvalidHuffmanCode`] when no code
    /// of any length matches.
    #[inline]
    pub fn decode(&self, stream: &mut BitStream<'_>) -> Result<u16> {
        let mut code = 0u32;
        for len in 1..=self.max_code_length {
            if stream.bits_left() == 0 {
                return Err(StreamArcError::unexpected_eof(1));
            }
            code = (code << 1) | stream.read_bits(1) as u32;
            if let Some(symbol) = self.lookup(code, len) {
                return Ok(symbol);
            }
        }

        Err(StreamArcError::invalid_huffman(stream.bits_read()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamarc_core::bitstream::PackingDirection;

    #[test]
    fn test_huffman_table_simple() {
        // A=0, B=10, C=11
        let lengths = [1u8, 2, 2];
        let table = HuffmanTable::from_code_lengths(&lengths).unwrap();
        assert_eq!(table.lookup(0b0, 1), Some(0));
        assert_eq!(table.lookup(0b10, 2), Some(1));
        assert_eq!(table.lookup(0b11, 2), Some(2));
        assert_eq!(table.lookup(0b1, 1), None);

        // A B C A: stream bits 0 | 1 0 | 1 1 | 0
        let data = [0b0001_1010u8];
        let mut stream = BitStream::new(&data, PackingDirection::LsbFirst);
        assert_eq!(table.decode(&mut stream).unwrap(), 0);
        assert_eq!(table.decode(&mut stream).unwrap(), 1);
        assert_eq!(table.decode(&mut stream).unwrap(), 2);
        assert_eq!(table.decode(&mut stream).unwrap(), 0);
    }

    #[test]
    fn test_rfc1951_example() {
        // RFC 1951 §3.2.2: lengths (3, 3, 3, 3, 3, 2, 4, 4) for A..H
        let lengths = [3u8, 3, 3, 3, 3, 2, 4, 4];
        let table = HuffmanTable::from_code_lengths(&lengths).unwrap();
        assert_eq!(table.lookup(0b010, 3), Some(0));
        assert_eq!(table.lookup(0b011, 3), Some(1));
        assert_eq!(table.lookup(0b100, 3), Some(2));
        assert_eq!(table.lookup(0b101, 3), Some(3));
        assert_eq!(table.lookup(0b110, 3), Some(4));
        assert_eq!(table.lookup(0b00, 2), Some(5));
        assert_eq!(table.lookup(0b1110, 4), Some(6));
        assert_eq!(table.lookup(0b1111, 4), Some(7));
    }

    #[test]
    fn test_over_subscribed_rejected() {
        let lengths = [1u8, 1, 1];
        let err = HuffmanTable::from_code_lengths(&lengths).unwrap_err();
        assert!(matches!(err, StreamArcError::MalformedHuffman { .. }));

        let lengths = [2u8, 2, 2, 2, 2];
        assert!(HuffmanTable::from_code_lengths(&lengths).is_err());
    }

    #[test]
    fn test_too_long_rejected() {
        let lengths = [16u8, 1];
        assert!(matches!(
            HuffmanTable::from_code_lengths(&lengths),
            Err(StreamArcError::MalformedHuffman { .. })
        ));
    }

    #[test]
    fn test_empty_table() {
        let lengths = [0u8; 4];
        let table = HuffmanTable::from_code_lengths(&lengths).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.max_code_length(), 0);

        let data = [0xFFu8];
        let mut stream = BitStream::new(&data, PackingDirection::LsbFirst);
        assert!(matches!(
            table.decode(&mut stream),
            Err(StreamArcError::InvalidHuffmanCode { .. })
        ));
    }

    #[test]
    fn test_single_symbol() {
        let lengths = [0u8, 1, 0, 0];
        let table = HuffmanTable::from_code_lengths(&lengths).unwrap();

        let data = [0b0000_0010u8];
        let mut stream = BitStream::new(&data, PackingDirection::LsbFirst);
        assert_eq!(table.decode(&mut stream).unwrap(), 1);
        // The unused code 1 matches nothing.
        assert!(matches!(
            table.decode(&mut stream),
            Err(StreamArcError::InvalidHuffmanCode { .. })
        ));
    }

    #[test]
    fn test_decode_past_end() {
        let lengths = [3u8, 3, 3, 3, 3, 2, 4, 4];
        let table = HuffmanTable::from_code_lengths(&lengths).unwrap();
        // 0b1111 needs four bits; only the top three are left.
        let data = [0xFFu8];
        let mut stream = BitStream::new(&data, PackingDirection::LsbFirst);
        assert_eq!(table.decode(&mut stream).unwrap(), 7);
        assert_eq!(table.decode(&mut stream).unwrap(), 7);
        assert!(matches!(
            table.decode(&mut stream),
            Err(StreamArcError::UnexpectedEof { .. })
        ));
    }
}
