//! DEFLATE decompression (inflate).
//!
//! This module implements the DEFLATE decompression algorithm as specified
//! in RFC 1951. It supports all three block types:
//! - Type 0: Stored (uncompressed)
//! - Type 1: Fixed Huffman codes
//! - Type 2: Dynamic Huffman codes
//!
//! The whole compressed entry is decoded from one in-memory slice into a
//! growable output buffer. Back-references may reach anywhere into the
//! output produced so far.

use crate::huffman::{CODELEN_ALPHABET_SIZE, END_OF_BLOCK, HuffmanTable};
use crate::tables::{
    CODE_LENGTH_ORDER, distance_code, fixed_distance_table, fixed_litlen_table, length_code,
};
use std::fmt;
use streamarc_core::bitstream::{BitStream, PackingDirection};
use streamarc_core::error::{Result, StreamArcError};

/// DEFLATE block encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    /// Type 0: raw bytes.
    Stored,
    /// Type 1: fixed Huffman codes.
    Fixed,
    /// Type 2: Huffman codes sent in the block header.
    Dynamic,
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stored => write!(f, "stored"),
            Self::Fixed => write!(f, "fixed"),
            Self::Dynamic => write!(f, "dynamic"),
        }
    }
}

/// Summary of one decoded block, handed to progress callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    /// How the block was encoded.
    pub block_type: BlockType,
    /// Whether the BFINAL bit was set.
    pub is_final: bool,
    /// Bytes this block produced.
    pub block_bytes: usize,
    /// Bytes produced by all blocks so far.
    pub total_bytes: usize,
}

/// DEFLATE decompressor over a complete compressed slice.
#[derive(Debug)]
pub struct Inflater<'a> {
    reader: BitStream<'a>,
    output: Vec<u8>,
    final_block: bool,
}

impl<'a> Inflater<'a> {
    /// Create a decompressor for `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_size_hint(data, 0)
    }

    /// Create a decompressor whose output buffer starts with room for
    /// `size_hint` bytes, typically the entry's declared uncompressed size.
    pub fn with_size_hint(data: &'a [u8], size_hint: usize) -> Self {
        Self {
            reader: BitStream::new(data, PackingDirection::LsbFirst),
            output: Vec::with_capacity(size_hint),
            final_block: false,
        }
    }

    /// Compressed bits consumed so far.
    pub fn bits_read(&self) -> u64 {
        self.reader.bits_read()
    }

    /// Decompress every block.
    pub fn inflate(self) -> Result<Vec<u8>> {
        self.inflate_with(|_| {})
    }

    /// Decompress every block, calling `on_block` after each one.
    pub fn inflate_with<F>(mut self, mut on_block: F) -> Result<Vec<u8>>
    where
        F: FnMut(&BlockInfo),
    {
        while !self.final_block {
            let info = self.inflate_block()?;
            on_block(&info);
        }
        Ok(self.output)
    }

    /// Byte offset for error reports.
    fn offset(&self) -> u64 {
        self.reader.bits_read() / 8
    }

    /// Read `n` bits (0 allowed), failing if the data ends first.
    #[inline]
    fn read(&mut self, n: u8) -> Result<u32> {
        if n == 0 {
            return Ok(0);
        }
        let left = self.reader.bits_left();
        if left < u64::from(n) {
            return Err(StreamArcError::unexpected_eof((u64::from(n) - left) as usize));
        }
        Ok(self.reader.read_bits(u32::from(n)) as u32)
    }

    /// Decompress a single block.
    fn inflate_block(&mut self) -> Result<BlockInfo> {
        let start = self.output.len();
        let bfinal = self.read(1)? != 0;
        let btype = self.read(2)? as u8;
        self.final_block = bfinal;

        let block_type = match btype {
            0 => BlockType::Stored,
            1 => BlockType::Fixed,
            2 => BlockType::Dynamic,
            _ => return Err(StreamArcError::unsupported_block_type(btype)),
        };
        log::trace!("inflate: {block_type} block, final={bfinal}");

        match block_type {
            BlockType::Stored => self.inflate_stored()?,
            BlockType::Fixed => self.inflate_fixed()?,
            BlockType::Dynamic => self.inflate_dynamic()?,
        }

        Ok(BlockInfo {
            block_type,
            is_final: bfinal,
            block_bytes: self.output.len() - start,
            total_bytes: self.output.len(),
        })
    }

    /// Decompress a stored (uncompressed) block.
    fn inflate_stored(&mut self) -> Result<()> {
        let header = self.read_aligned(4)?;
        let len = u16::from_le_bytes([header[0], header[1]]);
        let nlen = u16::from_le_bytes([header[2], header[3]]);

        if len != !nlen {
            return Err(StreamArcError::corrupted(
                self.offset(),
                format!("LEN/NLEN mismatch: {len:#06x} vs {nlen:#06x}"),
            ));
        }

        let bytes = self.read_aligned(len as usize)?;
        self.output.extend_from_slice(bytes);
        Ok(())
    }

    fn read_aligned(&mut self, n: usize) -> Result<&'a [u8]> {
        self.reader.read_bytes(n).map_err(|err| match err {
            StreamArcError::Overflow {
                requested,
                available,
            } => StreamArcError::unexpected_eof((requested - available) * 8),
            other => other,
        })
    }

    /// Decompress a block with fixed Huffman codes.
    fn inflate_fixed(&mut self) -> Result<()> {
        let litlen_table = fixed_litlen_table()?;
        let dist_table = fixed_distance_table()?;
        self.inflate_huffman(litlen_table, dist_table)
    }

    /// Decompress a block with dynamic Huffman codes.
    fn inflate_dynamic(&mut self) -> Result<()> {
        let hlit = self.read(5)? as usize + 257;
        let hdist = self.read(5)? as usize + 1;
        let hclen = self.read(4)? as usize + 4;

        let mut code_length_lengths = [0u8; CODELEN_ALPHABET_SIZE];
        for &symbol in CODE_LENGTH_ORDER.iter().take(hclen) {
            code_length_lengths[symbol] = self.read(3)? as u8;
        }
        let code_length_table = HuffmanTable::from_code_lengths(&code_length_lengths)?;

        let mut all_lengths = vec![0u8; hlit + hdist];
        let mut i = 0;
        while i < all_lengths.len() {
            let symbol = code_length_table.decode(&mut self.reader)?;
            let (value, repeat) = match symbol {
                0..=15 => (symbol as u8, 1),
                16 => {
                    if i == 0 {
                        return Err(StreamArcError::corrupted(
                            self.offset(),
                            "repeat code 16 with no previous length",
                        ));
                    }
                    (all_lengths[i - 1], self.read(2)? as usize + 3)
                }
                17 => (0, self.read(3)? as usize + 3),
                18 => (0, self.read(7)? as usize + 11),
                _ => return Err(StreamArcError::invalid_huffman(self.reader.bits_read())),
            };

            if i + repeat > all_lengths.len() {
                return Err(StreamArcError::corrupted(
                    self.offset(),
                    format!(
                        "code length repeat overruns {} lengths",
                        all_lengths.len()
                    ),
                ));
            }
            all_lengths[i..i + repeat].fill(value);
            i += repeat;
        }

        if all_lengths[END_OF_BLOCK as usize] == 0 {
            return Err(StreamArcError::malformed_huffman(
                "dynamic block has no end-of-block code",
            ));
        }

        let litlen_table = HuffmanTable::from_code_lengths(&all_lengths[..hlit])?;
        let dist_table = HuffmanTable::from_code_lengths(&all_lengths[hlit..])?;
        self.inflate_huffman(&litlen_table, &dist_table)
    }

    /// Decode symbols until end-of-block.
    fn inflate_huffman(
        &mut self,
        litlen_table: &HuffmanTable,
        dist_table: &HuffmanTable,
    ) -> Result<()> {
        loop {
            let symbol = litlen_table.decode(&mut self.reader)?;

            if symbol < END_OF_BLOCK {
                self.output.push(symbol as u8);
                continue;
            }
            if symbol == END_OF_BLOCK {
                return Ok(());
            }

            let (base, extra_bits) = length_code(symbol).ok_or_else(|| {
                StreamArcError::corrupted(
                    self.offset(),
                    format!("invalid literal/length symbol {symbol}"),
                )
            })?;
            let length = base as usize + self.read(extra_bits)? as usize;

            let dist_symbol = dist_table.decode(&mut self.reader)?;
            let (base, extra_bits) = distance_code(dist_symbol).ok_or_else(|| {
                StreamArcError::corrupted(
                    self.offset(),
                    format!("invalid distance symbol {dist_symbol}"),
                )
            })?;
            let distance = base as usize + self.read(extra_bits)? as usize;

            self.copy_match(distance, length)?;
        }
    }

    /// Copy `length` bytes starting `distance` bytes back.
    #[inline]
    fn copy_match(&mut self, distance: usize, length: usize) -> Result<()> {
        let size = self.output.len();
        if distance == 0 || distance > size {
            return Err(StreamArcError::invalid_distance(distance, size));
        }

        let start = size - distance;
        if length > distance {
            // Overlapping: the copy reads bytes it has just written.
            self.output.reserve(length);
            for i in 0..length {
                let byte = self.output[start + i];
                self.output.push(byte);
            }
        } else {
            self.output.extend_from_within(start..start + length);
        }
        Ok(())
    }
}

/// Decompress DEFLATE data.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    Inflater::new(data).inflate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamarc_core::bitstream::BitBuffer;

    /// Write a fixed-table literal/length code, most significant bit first.
    fn put_fixed_symbol(buf: &mut BitBuffer, symbol: u16) {
        let (code, len) = match symbol {
            0..=143 => (0x30 + symbol as u32, 8),
            144..=255 => (0x190 + (symbol as u32 - 144), 9),
            256..=279 => (symbol as u32 - 256, 7),
            _ => (0xC0 + (symbol as u32 - 280), 8),
        };
        put_code(buf, code, len);
    }

    fn put_code(buf: &mut BitBuffer, code: u32, len: u32) {
        for i in (0..len).rev() {
            buf.write_bits(u64::from((code >> i) & 1), 1).unwrap();
        }
    }

    #[test]
    fn test_inflate_stored() {
        let compressed = [
            0x01, // BFINAL=1, BTYPE=00
            0x05, 0x00, // LEN=5
            0xFA, 0xFF, // NLEN
            b'H', b'e', b'l', b'l', b'o',
        ];
        assert_eq!(inflate(&compressed).unwrap(), b"Hello");
    }

    #[test]
    fn test_inflate_stored_nlen_mismatch() {
        let compressed = [0x01, 0x05, 0x00, 0xFB, 0xFF, b'H', b'e', b'l', b'l', b'o'];
        assert!(matches!(
            inflate(&compressed),
            Err(StreamArcError::CorruptedData { .. })
        ));
    }

    #[test]
    fn test_inflate_stored_truncated() {
        let compressed = [0x01, 0x05, 0x00, 0xFA, 0xFF, b'H', b'e'];
        assert!(matches!(
            inflate(&compressed),
            Err(StreamArcError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_reserved_block_type() {
        // BFINAL=1, BTYPE=11
        let compressed = [0x07, 0x00];
        assert!(matches!(
            inflate(&compressed),
            Err(StreamArcError::UnsupportedBlockType { block_type: 3 })
        ));
    }

    #[test]
    fn test_fixed_literals() {
        let mut buf = BitBuffer::new(8, PackingDirection::LsbFirst);
        buf.write_bits(1, 1).unwrap();
        buf.write_bits(1, 2).unwrap();
        for &b in b"Hi\xff" {
            put_fixed_symbol(&mut buf, u16::from(b));
        }
        put_fixed_symbol(&mut buf, END_OF_BLOCK);

        let data = buf.into_inner();
        assert_eq!(inflate(&data).unwrap(), b"Hi\xff");
    }

    #[test]
    fn test_fixed_max_length_symbol() {
        // 'z', then symbol 285 (length 258) at distance 1
        let mut buf = BitBuffer::new(8, PackingDirection::LsbFirst);
        buf.write_bits(1, 1).unwrap();
        buf.write_bits(1, 2).unwrap();
        put_fixed_symbol(&mut buf, u16::from(b'z'));
        put_fixed_symbol(&mut buf, 285);
        put_code(&mut buf, 0, 5);
        put_fixed_symbol(&mut buf, END_OF_BLOCK);

        let data = buf.into_inner();
        let out = inflate(&data).unwrap();
        assert_eq!(out.len(), 259);
        assert!(out.iter().all(|&b| b == b'z'));
    }

    #[test]
    fn test_overlapping_copy() {
        // "ab", then length 5 at distance 2 -> "abababa"
        let mut buf = BitBuffer::new(8, PackingDirection::LsbFirst);
        buf.write_bits(1, 1).unwrap();
        buf.write_bits(1, 2).unwrap();
        put_fixed_symbol(&mut buf, u16::from(b'a'));
        put_fixed_symbol(&mut buf, u16::from(b'b'));
        put_fixed_symbol(&mut buf, 259);
        put_code(&mut buf, 1, 5);
        put_fixed_symbol(&mut buf, END_OF_BLOCK);

        let data = buf.into_inner();
        assert_eq!(inflate(&data).unwrap(), b"abababa");
    }

    #[test]
    fn test_distance_before_start() {
        let mut buf = BitBuffer::new(8, PackingDirection::LsbFirst);
        buf.write_bits(1, 1).unwrap();
        buf.write_bits(1, 2).unwrap();
        put_fixed_symbol(&mut buf, u16::from(b'a'));
        put_fixed_symbol(&mut buf, 257);
        put_code(&mut buf, 3, 5); // distance 4
        put_fixed_symbol(&mut buf, END_OF_BLOCK);

        let data = buf.into_inner();
        assert!(matches!(
            inflate(&data),
            Err(StreamArcError::InvalidDistance {
                distance: 4,
                output_size: 1
            })
        ));
    }

    #[test]
    fn test_invalid_distance_symbol() {
        let mut buf = BitBuffer::new(8, PackingDirection::LsbFirst);
        buf.write_bits(1, 1).unwrap();
        buf.write_bits(1, 2).unwrap();
        put_fixed_symbol(&mut buf, u16::from(b'a'));
        put_fixed_symbol(&mut buf, 257);
        put_code(&mut buf, 30, 5);
        put_fixed_symbol(&mut buf, END_OF_BLOCK);

        let data = buf.into_inner();
        assert!(matches!(
            inflate(&data),
            Err(StreamArcError::CorruptedData { .. })
        ));
    }

    #[test]
    fn test_truncated_fixed_block() {
        let mut buf = BitBuffer::new(2, PackingDirection::LsbFirst);
        buf.write_bits(1, 1).unwrap();
        buf.write_bits(1, 2).unwrap();
        put_fixed_symbol(&mut buf, u16::from(b'a'));

        let data = buf.into_inner();
        assert!(matches!(
            inflate(&data),
            Err(StreamArcError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_multiple_blocks_report_progress() {
        let mut buf = BitBuffer::new(16, PackingDirection::LsbFirst);
        // Fixed block "ab", not final
        buf.write_bits(0, 1).unwrap();
        buf.write_bits(1, 2).unwrap();
        put_fixed_symbol(&mut buf, u16::from(b'a'));
        put_fixed_symbol(&mut buf, u16::from(b'b'));
        put_fixed_symbol(&mut buf, END_OF_BLOCK);
        // Stored block "cd", final
        buf.write_bits(1, 1).unwrap();
        buf.write_bits(0, 2).unwrap();
        buf.set_packing_direction(PackingDirection::MsbFirst).unwrap();
        buf.set_packing_direction(PackingDirection::LsbFirst).unwrap();
        buf.write_bits(2, 16).unwrap();
        buf.write_bits(!2u64 & 0xFFFF, 16).unwrap();
        buf.write_bits(u64::from(b'c'), 8).unwrap();
        buf.write_bits(u64::from(b'd'), 8).unwrap();

        let data = buf.into_inner();
        let mut blocks = Vec::new();
        let out = Inflater::new(&data)
            .inflate_with(|info| blocks.push(*info))
            .unwrap();

        assert_eq!(out, b"abcd");
        assert_eq!(
            blocks,
            vec![
                BlockInfo {
                    block_type: BlockType::Fixed,
                    is_final: false,
                    block_bytes: 2,
                    total_bytes: 2,
                },
                BlockInfo {
                    block_type: BlockType::Stored,
                    is_final: true,
                    block_bytes: 2,
                    total_bytes: 4,
                },
            ]
        );
    }
}
