//! Error types for streamarc operations.
//!
//! A single error enum covers the whole stack. Only one variant is
//! recoverable: [`StreamArcError::Overflow`] signals that a byte stream ran
//! out of input and the caller may retry once more bytes are pushed. Every
//! other variant is fatal for the archive being processed.

use std::io;
use thiserror::Error;

/// The main error type for streamarc operations.
#[derive(Debug, Error)]
pub enum StreamArcError {
    /// I/O error from an underlying reader/writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A read ran past the end of all bytes currently available.
    #[error("Overflowed the byte stream: requested {requested} bytes, {available} available")]
    Overflow {
        /// Number of bytes requested.
        requested: usize,
        /// Number of bytes that were left in the stream.
        available: usize,
    },

    /// Huffman code lengths that admit no canonical assignment.
    #[error("Malformed Huffman code lengths: {message}")]
    MalformedHuffman {
        /// Description of the inconsistency.
        message: String,
    },

    /// No Huffman code matched the bits read.
    #[error("Invalid Huffman code at bit position {bit_position}")]
    InvalidHuffmanCode {
        /// Bit position where decoding gave up.
        bit_position: u64,
    },

    /// Unsupported compression method in a container entry.
    #[error("Unsupported compression method: {method}")]
    UnsupportedMethod {
        /// The compression method identifier.
        method: String,
    },

    /// Reserved or unknown DEFLATE block type.
    #[error("Unsupported DEFLATE block type: {block_type}")]
    UnsupportedBlockType {
        /// The two-bit block type read from the header.
        block_type: u8,
    },

    /// Archive format recognised but not decodable.
    #[error("Unsupported archive format: {format}")]
    UnsupportedFormat {
        /// Name of the format.
        format: String,
    },

    /// A fixed-size bit or byte buffer cannot hold the requested write.
    #[error("Capacity exceeded: requested {requested_bits} bits, only {available_bits} available")]
    Capacity {
        /// Bits the caller tried to write.
        requested_bits: u64,
        /// Bits left in the buffer.
        available_bits: u64,
    },

    /// A number does not fit the requested byte width.
    #[error("Value {value} does not fit in {num_bytes} byte(s)")]
    ValueOutOfRange {
        /// The offending value.
        value: i128,
        /// Requested width in bytes.
        num_bytes: usize,
    },

    /// An operation was called in a state that does not allow it.
    #[error("Protocol misuse: {message}")]
    ProtocolMisuse {
        /// What was attempted.
        message: String,
    },

    /// CRC checksum mismatch.
    #[error("CRC mismatch: expected {expected:#x}, computed {computed:#x}")]
    CrcMismatch {
        /// Expected CRC value from the archive.
        expected: u32,
        /// Computed CRC value from the data.
        computed: u32,
    },

    /// Corrupted data in archive.
    #[error("Corrupted data at offset {offset}: {message}")]
    CorruptedData {
        /// Byte offset where corruption was detected.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// Invalid header format.
    #[error("Invalid header: {message}")]
    InvalidHeader {
        /// Description of the header error.
        message: String,
    },

    /// Compressed data ended in the middle of a symbol.
    #[error("Unexpected end of data: expected {expected} more bits")]
    UnexpectedEof {
        /// Number of bits that were expected but not available.
        expected: usize,
    },

    /// Back-reference reaching before the start of the output.
    #[error("Invalid back-reference distance: {distance} exceeds output size {output_size}")]
    InvalidDistance {
        /// The invalid distance value.
        distance: usize,
        /// Bytes produced so far.
        output_size: usize,
    },

    /// The worker thread went away before answering.
    #[error("Worker disconnected")]
    WorkerDisconnected,

    /// The worker reported an unrecoverable failure.
    #[error("Worker failed: {message}")]
    WorkerFailed {
        /// Message carried by the worker's `error` event.
        message: String,
    },
}

/// Result type alias for streamarc operations.
pub type Result<T> = std::result::Result<T, StreamArcError>;

impl StreamArcError {
    /// Create an overflow error.
    pub fn overflow(requested: usize, available: usize) -> Self {
        Self::Overflow {
            requested,
            available,
        }
    }

    /// Create a malformed Huffman lengths error.
    pub fn malformed_huffman(message: impl Into<String>) -> Self {
        Self::MalformedHuffman {
            message: message.into(),
        }
    }

    /// Create an invalid Huffman code error.
    pub fn invalid_huffman(bit_position: u64) -> Self {
        Self::InvalidHuffmanCode { bit_position }
    }

    /// Create an unsupported method error.
    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::UnsupportedMethod {
            method: method.into(),
        }
    }

    /// Create an unsupported block type error.
    pub fn unsupported_block_type(block_type: u8) -> Self {
        Self::UnsupportedBlockType { block_type }
    }

    /// Create an unsupported format error.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Create a capacity error.
    pub fn capacity(requested_bits: u64, available_bits: u64) -> Self {
        Self::Capacity {
            requested_bits,
            available_bits,
        }
    }

    /// Create a value out of range error.
    pub fn value_out_of_range(value: impl Into<i128>, num_bytes: usize) -> Self {
        Self::ValueOutOfRange {
            value: value.into(),
            num_bytes,
        }
    }

    /// Create a protocol misuse error.
    pub fn protocol_misuse(message: impl Into<String>) -> Self {
        Self::ProtocolMisuse {
            message: message.into(),
        }
    }

    /// Create a CRC mismatch error.
    pub fn crc_mismatch(expected: u32, computed: u32) -> Self {
        Self::CrcMismatch { expected, computed }
    }

    /// Create a corrupted data error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::CorruptedData {
            offset,
            message: message.into(),
        }
    }

    /// Create an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Create an unexpected EOF error.
    pub fn unexpected_eof(expected: usize) -> Self {
        Self::UnexpectedEof { expected }
    }

    /// Create an invalid distance error.
    pub fn invalid_distance(distance: usize, output_size: usize) -> Self {
        Self::InvalidDistance {
            distance,
            output_size,
        }
    }

    /// Create a worker failure error.
    pub fn worker_failed(message: impl Into<String>) -> Self {
        Self::WorkerFailed {
            message: message.into(),
        }
    }

    /// Whether this is the recoverable "need more bytes" condition.
    pub fn is_overflow(&self) -> bool {
        matches!(self, Self::Overflow { .. })
    }
}
