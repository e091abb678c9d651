//! # streamarc deflate
//!
//! DEFLATE decompression (RFC 1951).
//!
//! All three block types are supported:
//!
//! - Stored (uncompressed) blocks
//! - Fixed Huffman codes
//! - Dynamic Huffman codes
//!
//! Compression is not provided; archives are written with the STORE method.
//!
//! ## Example
//!
//! ```rust
//! use streamarc_deflate::inflate;
//!
//! // "hello hello hello" as a single fixed-Huffman block
//! let compressed = [
//!     0xcb, 0x48, 0xcd, 0xc9, 0xc9, 0x57, 0xc8, 0x40, 0x90, 0x00,
//! ];
//! let decompressed = inflate(&compressed).unwrap();
//! assert_eq!(&decompressed, b"hello hello hello");
//! ```
//!
//! Callers that want to follow progress block by block use
//! [`Inflater::inflate_with`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod huffman;
pub mod inflate;
pub mod tables;

// Re-exports
pub use huffman::HuffmanTable;
pub use inflate::{BlockInfo, BlockType, Inflater, inflate};
