//! Byte-level reading over paged input and fixed-size byte writing.
//!
//! [`ByteStream`] is the reader every container format is parsed from. Its
//! input is a queue of immutable pages: [`ByteStream::push`] appends a page
//! as bytes arrive, without copying what is already queued, and
//! [`ByteStream::tee`] forks an independent cursor over the same pages for
//! speculative parsing. Reading past the last available byte fails with
//! [`StreamArcError::Overflow`], which streaming readers treat as "wait for
//! more input" rather than as corruption.
//!
//! Numbers are little-endian, as in ZIP.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::{Result, StreamArcError};

#[inline]
fn check_number_width(n: usize) {
    assert!((1..=8).contains(&n), "number width must be 1..=8 bytes, got {n}");
}

/// A byte reader over an append-only sequence of pages.
#[derive(Debug, Clone, Default)]
pub struct ByteStream {
    /// Unconsumed pages; the front one is the current page.
    pages: VecDeque<Arc<[u8]>>,
    /// Offset into the current page.
    ptr: usize,
    /// Bytes consumed since construction.
    bytes_read: u64,
    /// Unconsumed bytes across all pages.
    len: usize,
}

impl ByteStream {
    /// Create a stream whose first page is `bytes`.
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        let mut stream = Self::default();
        stream.push(bytes);
        stream
    }

    /// Append a page. Empty pages are ignored.
    pub fn push(&mut self, bytes: impl Into<Arc<[u8]>>) {
        let page = bytes.into();
        if !page.is_empty() {
            self.len += page.len();
            self.pages.push_back(page);
        }
    }

    /// Fork an independent cursor over the same pages.
    ///
    /// No page data is copied. Reads on the fork leave `self` untouched,
    /// so a parser can try a speculative read and then either assign the
    /// fork back (commit) or drop it (discard).
    pub fn tee(&self) -> Self {
        self.clone()
    }

    /// Total bytes consumed since construction.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Bytes still available across all pages.
    pub fn bytes_left(&self) -> usize {
        self.len
    }

    fn ensure(&self, n: usize) -> Result<()> {
        let available = self.bytes_left();
        if n > available {
            return Err(StreamArcError::overflow(n, available));
        }
        Ok(())
    }

    /// Iterate over the next `n` bytes without consuming them.
    ///
    /// The caller must have checked availability.
    fn upcoming(&self, n: usize) -> impl Iterator<Item = u8> + '_ {
        self.pages
            .iter()
            .enumerate()
            .flat_map(move |(i, page)| {
                let start = if i == 0 { self.ptr } else { 0 };
                page[start..].iter().copied()
            })
            .take(n)
    }

    /// Skip `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        let mut remaining = n;
        while remaining > 0 {
            let Some(page) = self.pages.front() else {
                break;
            };
            let in_page = page.len() - self.ptr;
            if remaining < in_page {
                self.ptr += remaining;
                break;
            }
            remaining -= in_page;
            self.pages.pop_front();
            self.ptr = 0;
        }
        self.len -= n;
        self.bytes_read += n as u64;
        Ok(())
    }

    /// Peek an unsigned little-endian number of `n` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `n` is not in `1..=8`.
    pub fn peek_u(&self, n: usize) -> Result<u64> {
        check_number_width(n);
        self.ensure(n)?;
        Ok(self
            .upcoming(n)
            .enumerate()
            .fold(0u64, |acc, (i, b)| acc | (u64::from(b) << (8 * i))))
    }

    /// Read an unsigned little-endian number of `n` bytes.
    pub fn read_u(&mut self, n: usize) -> Result<u64> {
        let value = self.peek_u(n)?;
        self.skip(n)?;
        Ok(value)
    }

    /// Peek a two's-complement little-endian number of `n` bytes.
    pub fn peek_signed(&self, n: usize) -> Result<i64> {
        let raw = self.peek_u(n)?;
        let unused = 64 - 8 * n as u32;
        // Sign-extend from the top bit of the last byte.
        Ok(((raw << unused) as i64) >> unused)
    }

    /// Read a two's-complement little-endian number of `n` bytes.
    pub fn read_signed(&mut self, n: usize) -> Result<i64> {
        let value = self.peek_signed(n)?;
        self.skip(n)?;
        Ok(value)
    }

    /// Peek at the next `n` bytes.
    pub fn peek_bytes(&self, n: usize) -> Result<Vec<u8>> {
        self.ensure(n)?;
        let mut out = Vec::with_capacity(n);
        for (i, page) in self.pages.iter().enumerate() {
            let start = if i == 0 { self.ptr } else { 0 };
            let take = (n - out.len()).min(page.len() - start);
            out.extend_from_slice(&page[start..start + take]);
            if out.len() == n {
                break;
            }
        }
        Ok(out)
    }

    /// Read the next `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let bytes = self.peek_bytes(n)?;
        self.skip(n)?;
        Ok(bytes)
    }

    /// Peek at `n` bytes as a string, one char per byte.
    pub fn peek_string(&self, n: usize) -> Result<String> {
        self.ensure(n)?;
        Ok(self.upcoming(n).map(char::from).collect())
    }

    /// Read `n` bytes as a string, one char per byte.
    pub fn read_string(&mut self, n: usize) -> Result<String> {
        let s = self.peek_string(n)?;
        self.skip(n)?;
        Ok(s)
    }
}

/// A fixed-capacity byte writer.
#[derive(Debug, Clone)]
pub struct ByteBuffer {
    data: Vec<u8>,
    ptr: usize,
}

impl ByteBuffer {
    /// Create a zero-filled buffer of `num_bytes` bytes.
    pub fn new(num_bytes: usize) -> Self {
        Self {
            data: vec![0; num_bytes],
            ptr: 0,
        }
    }

    /// Write position.
    pub fn ptr(&self) -> usize {
        self.ptr
    }

    /// Bytes that can still be written.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.ptr
    }

    /// The whole backing buffer.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer and return its bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    fn reserve(&self, n: usize) -> Result<()> {
        let available = self.remaining();
        if n > available {
            return Err(StreamArcError::capacity(n as u64 * 8, available as u64 * 8));
        }
        Ok(())
    }

    /// Write one byte.
    pub fn insert_byte(&mut self, byte: u8) -> Result<()> {
        self.insert_bytes(&[byte])
    }

    /// Write a run of bytes.
    pub fn insert_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.reserve(bytes.len())?;
        self.data[self.ptr..self.ptr + bytes.len()].copy_from_slice(bytes);
        self.ptr += bytes.len();
        Ok(())
    }

    /// Write `value` as an `n`-byte little-endian unsigned number.
    ///
    /// # Panics
    ///
    /// Panics if `n` is not in `1..=8`.
    pub fn write_u(&mut self, value: u64, n: usize) -> Result<()> {
        check_number_width(n);
        if n < 8 && value >> (8 * n) != 0 {
            return Err(StreamArcError::value_out_of_range(value, n));
        }
        self.insert_bytes(&value.to_le_bytes()[..n])
    }

    /// Write `value` as an `n`-byte little-endian two's-complement number.
    pub fn write_signed(&mut self, value: i64, n: usize) -> Result<()> {
        check_number_width(n);
        if n < 8 {
            let half = 1i64 << (8 * n - 1);
            if value < -half || value >= half {
                return Err(StreamArcError::value_out_of_range(value, n));
            }
        }
        self.insert_bytes(&value.to_le_bytes()[..n])
    }

    /// Write an ASCII string byte for byte.
    pub fn write_ascii(&mut self, s: &str) -> Result<()> {
        if !s.is_ascii() {
            return Err(StreamArcError::invalid_header(format!(
                "non-ASCII string {s:?}"
            )));
        }
        self.insert_bytes(s.as_bytes())
    }
}
