//! Bit-level reading and writing over in-memory buffers.
//!
//! This module provides [`BitStream`] for reading and [`BitBuffer`] for
//! writing data at the bit level, in either packing direction.
//!
//! # Bit Ordering
//!
//! ```text
//!   byte0      byte1      byte2      byte3
//! 7......0 | 7......0 | 7......0 | 7......0
//! ```
//!
//! With [`PackingDirection::LsbFirst`] the bit cursor starts at bit 0 of
//! byte0 and moves up to bit 7 before jumping to byte1. This is the packing
//! DEFLATE uses for block headers and extra bits.
//!
//! With [`PackingDirection::MsbFirst`] the cursor starts at bit 7 of byte0
//! and moves down to bit 0.
//!
//! # Overflow
//!
//! Reading past the end of a [`BitStream`] never fails: the bits that were
//! available are returned and the missing ones are simply absent. Callers
//! that must detect truncation check [`BitStream::bits_left`] first.
//! Writing past the end of a [`BitBuffer`] fails with
//! [`StreamArcError::Capacity`].
//!
//! # Example
//!
//! ```
//! use streamarc_core::bitstream::{BitBuffer, BitStream, PackingDirection};
//!
//! let mut buffer = BitBuffer::new(2, PackingDirection::LsbFirst);
//! buffer.write_bits(0b101, 3).unwrap();
//! buffer.write_bits(0b1100, 4).unwrap();
//!
//! let data = buffer.into_inner();
//! let mut reader = BitStream::new(&data, PackingDirection::LsbFirst);
//! assert_eq!(reader.read_bits(3), 0b101);
//! assert_eq!(reader.read_bits(4), 0b1100);
//! ```

use crate::error::{Result, StreamArcError};

/// Mask for getting N number of bits (0-8).
const BITMASK: [u8; 9] = [0x00, 0x01, 0x03, 0x07, 0x0F, 0x1F, 0x3F, 0x7F, 0xFF];

/// Widest bit run a single read or write may request.
pub const MAX_BITS: u32 = 53;

/// Order in which bits are packed into each byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackingDirection {
    /// Least-significant bit (0) to most-significant (7).
    #[default]
    LsbFirst,
    /// Most-significant bit (7) to least-significant (0).
    MsbFirst,
}

#[inline]
fn check_bit_count(n: u32) {
    assert!(
        (1..=MAX_BITS).contains(&n),
        "bit count must be in 1..={MAX_BITS}, got {n}"
    );
}

/// A bit-level reader over a borrowed byte slice.
///
/// The cursor is a `(byte_ptr, bit_ptr)` pair where `bit_ptr` counts the
/// bits already consumed from the current byte, regardless of direction.
#[derive(Debug, Clone)]
pub struct BitStream<'a> {
    bytes: &'a [u8],
    byte_ptr: usize,
    bit_ptr: u32,
    bits_read: u64,
    direction: PackingDirection,
}

impl<'a> BitStream<'a> {
    /// Create a new `BitStream` reading `bytes` in the given direction.
    pub fn new(bytes: &'a [u8], direction: PackingDirection) -> Self {
        Self {
            bytes,
            byte_ptr: 0,
            bit_ptr: 0,
            bits_read: 0,
            direction,
        }
    }

    /// The packing direction this stream reads with.
    pub fn packing_direction(&self) -> PackingDirection {
        self.direction
    }

    /// Total number of bits consumed since construction.
    ///
    /// This counts requested bits, so it keeps growing on reads past the end.
    pub fn bits_read(&self) -> u64 {
        self.bits_read
    }

    /// Number of bits still available in the stream.
    pub fn bits_left(&self) -> u64 {
        let remaining_bytes = self.bytes.len().saturating_sub(self.byte_ptr) as u64;
        (remaining_bytes * 8).saturating_sub(u64::from(self.bit_ptr))
    }

    /// Current `(byte, bit)` cursor position.
    pub fn position(&self) -> (usize, u32) {
        (self.byte_ptr, self.bit_ptr)
    }

    /// Peek at `n` bits without consuming them.
    ///
    /// # Panics
    ///
    /// Panics if `n` is not in `1..=53`.
    #[inline]
    pub fn peek_bits(&self, n: u32) -> u64 {
        self.take_bits(n).0
    }

    /// Read `n` bits, advancing the cursor.
    ///
    /// # Panics
    ///
    /// Panics if `n` is not in `1..=53`.
    #[inline]
    pub fn read_bits(&mut self, n: u32) -> u64 {
        let (value, byte_ptr, bit_ptr) = self.take_bits(n);
        self.byte_ptr = byte_ptr;
        self.bit_ptr = bit_ptr;
        self.bits_read += u64::from(n);
        value
    }

    /// Read a single bit.
    #[inline]
    pub fn read_bit(&mut self) -> bool {
        self.read_bits(1) != 0
    }

    fn take_bits(&self, n: u32) -> (u64, usize, u32) {
        check_bit_count(n);
        match self.direction {
            PackingDirection::LsbFirst => self.take_lsb_first(n),
            PackingDirection::MsbFirst => self.take_msb_first(n),
        }
    }

    fn take_lsb_first(&self, n: u32) -> (u64, usize, u32) {
        let mut num = n;
        let mut byte_ptr = self.byte_ptr;
        let mut bit_ptr = self.bit_ptr;
        let mut result = 0u64;
        let mut bits_in = 0u32;

        while num > 0 {
            // Overflowed the stream, return what we got.
            let Some(&byte) = self.bytes.get(byte_ptr) else {
                break;
            };

            let left_in_byte = 8 - bit_ptr;
            if num >= left_in_byte {
                let chunk = (byte >> bit_ptr) & BITMASK[left_in_byte as usize];
                result |= u64::from(chunk) << bits_in;
                byte_ptr += 1;
                bit_ptr = 0;
                bits_in += left_in_byte;
                num -= left_in_byte;
            } else {
                let chunk = (byte >> bit_ptr) & BITMASK[num as usize];
                result |= u64::from(chunk) << bits_in;
                bit_ptr += num;
                break;
            }
        }

        (result, byte_ptr, bit_ptr)
    }

    fn take_msb_first(&self, n: u32) -> (u64, usize, u32) {
        let mut num = n;
        let mut byte_ptr = self.byte_ptr;
        let mut bit_ptr = self.bit_ptr;
        let mut result = 0u64;

        while num > 0 {
            // Overflowed the stream, return what we got.
            let Some(&byte) = self.bytes.get(byte_ptr) else {
                break;
            };

            let left_in_byte = 8 - bit_ptr;
            if num >= left_in_byte {
                result = (result << left_in_byte) | u64::from(byte & BITMASK[left_in_byte as usize]);
                byte_ptr += 1;
                bit_ptr = 0;
                num -= left_in_byte;
            } else {
                let shift = 8 - num - bit_ptr;
                let chunk = (byte >> shift) & BITMASK[num as usize];
                result = (result << num) | u64::from(chunk);
                bit_ptr += num;
                break;
            }
        }

        (result, byte_ptr, bit_ptr)
    }

    /// Discard the remaining bits of the current byte.
    pub fn align_to_byte(&mut self) {
        if self.bit_ptr != 0 {
            self.bits_read += u64::from(8 - self.bit_ptr);
            self.byte_ptr += 1;
            self.bit_ptr = 0;
        }
    }

    /// Peek at `n` whole bytes after aligning to the next byte boundary.
    ///
    /// Alignment is a side effect even for a peek: partial bits in the
    /// current byte are discarded.
    pub fn peek_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.align_to_byte();
        let available = self.bytes.len().saturating_sub(self.byte_ptr);
        if n > available {
            return Err(StreamArcError::overflow(n, available));
        }
        Ok(&self.bytes[self.byte_ptr..self.byte_ptr + n])
    }

    /// Read `n` whole bytes after aligning to the next byte boundary.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let bytes = self.peek_bytes(n)?;
        self.byte_ptr += n;
        self.bits_read += n as u64 * 8;
        Ok(bytes)
    }
}

/// A fixed-capacity bit writer.
///
/// The buffer is allocated zero-filled up front and never grows.
#[derive(Debug, Clone)]
pub struct BitBuffer {
    data: Vec<u8>,
    byte_ptr: usize,
    bit_ptr: u32,
    direction: PackingDirection,
}

impl BitBuffer {
    /// Create a zero-filled buffer of `num_bytes` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `num_bytes` is zero.
    pub fn new(num_bytes: usize, direction: PackingDirection) -> Self {
        assert!(num_bytes > 0, "BitBuffer needs at least one byte");
        Self {
            data: vec![0; num_bytes],
            byte_ptr: 0,
            bit_ptr: Self::start_bit(direction),
            direction,
        }
    }

    fn start_bit(direction: PackingDirection) -> u32 {
        match direction {
            PackingDirection::LsbFirst => 0,
            PackingDirection::MsbFirst => 7,
        }
    }

    /// The bytes written so far, including the partially filled byte.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer and return its bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    /// Current `(byte, bit)` cursor position.
    pub fn position(&self) -> (usize, u32) {
        (self.byte_ptr, self.bit_ptr)
    }

    /// The packing direction in effect.
    pub fn packing_direction(&self) -> PackingDirection {
        self.direction
    }

    /// Number of bits written, counting any padding from direction switches.
    pub fn bits_written(&self) -> u64 {
        let in_byte = match self.direction {
            PackingDirection::LsbFirst => self.bit_ptr,
            PackingDirection::MsbFirst => 7 - self.bit_ptr,
        };
        self.byte_ptr as u64 * 8 + u64::from(in_byte)
    }

    /// Number of bits that can still be written.
    pub fn bits_left(&self) -> u64 {
        (self.data.len() as u64 * 8).saturating_sub(self.bits_written())
    }

    /// Switch the packing direction.
    ///
    /// Switching mid-byte pads the rest of the current byte with zeros and
    /// moves the cursor to the next byte, which must exist.
    pub fn set_packing_direction(&mut self, direction: PackingDirection) -> Result<()> {
        if self.direction == direction {
            return Ok(());
        }

        if self.bit_ptr != Self::start_bit(self.direction) {
            if self.byte_ptr + 1 >= self.data.len() {
                return Err(StreamArcError::capacity(1, self.bits_left()));
            }
            self.byte_ptr += 1;
        }
        self.bit_ptr = Self::start_bit(direction);
        self.direction = direction;
        Ok(())
    }

    /// Write the low `n` bits of `value`.
    ///
    /// Fails without writing anything if the buffer cannot hold `n` more bits.
    ///
    /// # Panics
    ///
    /// Panics if `n` is not in `1..=53`.
    pub fn write_bits(&mut self, value: u64, n: u32) -> Result<()> {
        check_bit_count(n);

        let available = self.bits_left();
        if u64::from(n) > available {
            return Err(StreamArcError::capacity(u64::from(n), available));
        }

        let value = value & ((1u64 << n) - 1);
        match self.direction {
            PackingDirection::LsbFirst => self.write_lsb_first(value, n),
            PackingDirection::MsbFirst => self.write_msb_first(value, n),
        }
        Ok(())
    }

    fn write_lsb_first(&mut self, mut value: u64, n: u32) {
        let mut remaining = n;
        while remaining > 0 {
            let capacity = 8 - self.bit_ptr;
            let n_this = remaining.min(capacity);
            let chunk = (value as u8) & BITMASK[n_this as usize];
            self.data[self.byte_ptr] |= chunk << self.bit_ptr;

            self.bit_ptr += n_this;
            if self.bit_ptr == 8 {
                self.byte_ptr += 1;
                self.bit_ptr = 0;
            }
            value >>= n_this;
            remaining -= n_this;
        }
    }

    fn write_msb_first(&mut self, value: u64, n: u32) {
        let mut remaining = n;
        while remaining > 0 {
            let capacity = self.bit_ptr + 1;
            let n_this = remaining.min(capacity);
            let excess = remaining - n_this;
            let chunk = ((value >> excess) as u8) & BITMASK[n_this as usize];
            self.data[self.byte_ptr] |= chunk << (capacity - n_this);

            if n_this == capacity {
                self.byte_ptr += 1;
                self.bit_ptr = 7;
            } else {
                self.bit_ptr -= n_this;
            }
            remaining = excess;
        }
    }
}
