//! # streamarc core
//!
//! Core components for the streamarc archive codec.
//!
//! This crate provides the bit- and byte-level building blocks that the codec
//! and container layers are written against:
//!
//! - [`bitstream`]: Bit reader/writer in either packing direction
//! - [`bytestream`]: Paged byte reader with append and tee, fixed-size byte writer
//! - [`crc`]: CRC-32 checksum
//! - [`error`]: Error types
//!
//! ## Architecture
//!
//! streamarc is designed as a layered protocol stack:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L4: API                                                 │
//! │     Unarchiver/Zipper workers, events, CLI              │
//! ├─────────────────────────────────────────────────────────┤
//! │ L3: Container                                           │
//! │     ZIP local entries, central directory, TAR headers   │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Codec                                               │
//! │     Inflate (canonical Huffman + back-references)       │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Streams (this crate)                                │
//! │     BitStream/BitBuffer, ByteStream/ByteBuffer, CRC     │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use streamarc_core::bitstream::{BitStream, PackingDirection};
//! use streamarc_core::bytestream::ByteStream;
//! use streamarc_core::crc::Crc32;
//!
//! // Read bits least-significant first
//! let data = [0b0110_0101u8; 4];
//! let mut bits = BitStream::new(&data, PackingDirection::LsbFirst);
//! assert_eq!(bits.read_bits(4), 5);
//!
//! // Stream bytes that arrive in pages
//! let mut stream = ByteStream::new(vec![0x50, 0x4B]);
//! stream.push(vec![0x03, 0x04]);
//! assert_eq!(stream.read_u(4).unwrap(), 0x04034B50);
//!
//! // Compute CRC-32
//! assert_eq!(Crc32::compute(b"hello world"), 0x0D4A1185);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bitstream;
pub mod bytestream;
pub mod crc;
pub mod error;

// Re-exports for convenience
pub use bitstream::{BitBuffer, BitStream, PackingDirection};
pub use bytestream::{ByteBuffer, ByteStream};
pub use crc::Crc32;
pub use error::{Result, StreamArcError};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bitstream::{BitBuffer, BitStream, PackingDirection};
    pub use crate::bytestream::{ByteBuffer, ByteStream};
    pub use crate::crc::Crc32;
    pub use crate::error::{Result, StreamArcError};
}
