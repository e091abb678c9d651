//! Events reported by unarchivers and zippers.
//!
//! Every archive produces a totally ordered sequence: one `start`, any
//! number of `progress`/`extract` (or `compress`) events, then exactly one
//! `finish`, unless an `error` ends the sequence early. All types serialize
//! to JSON objects tagged by a `type` field; payload bytes are reported by
//! length only.

use serde::{Serialize, Serializer};

fn serialize_len<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(bytes.len() as u64)
}

/// Cumulative progress counters for one archive.
///
/// Counters only ever grow; an overflow pause never rolls them back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressInfo {
    /// Name of the entry most recently started.
    pub current_filename: String,
    /// Zero-based index of that entry.
    pub current_file_index: usize,
    /// Bytes produced so far for the current entry.
    pub bytes_unarchived_in_file: u64,
    /// Bytes produced so far across all entries.
    pub bytes_unarchived: u64,
    /// Sum of the declared uncompressed sizes of entries seen so far.
    pub total_uncompressed_bytes: u64,
    /// Number of entries; final once the archive trailer is read.
    pub total_files: usize,
    /// Archive bytes consumed by the parser.
    pub total_compressed_bytes_read: u64,
}

/// A fully extracted archive entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedFile {
    /// Decoded entry name.
    pub filename: String,
    /// Entry name exactly as stored in the archive.
    pub filename_raw_bytes: Vec<u8>,
    /// Size of the entry inside the archive.
    pub compressed_size: u64,
    /// Decompressed contents.
    #[serde(rename = "file_size", serialize_with = "serialize_len")]
    pub file_data: Vec<u8>,
}

/// Archive-level information available once parsing finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveMetadata {
    /// Archive comment from the end-of-central-directory record, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Events produced while unarchiving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnarchiveEvent {
    /// The first chunk was accepted.
    Start,
    /// A chunk was handed to the worker.
    Append {
        /// Size of the chunk.
        num_bytes: usize,
    },
    /// Progress counters changed.
    Progress(ProgressInfo),
    /// An entry was extracted.
    Extract(ExtractedFile),
    /// The archive is complete; no further events follow.
    Finish {
        /// Archive-level metadata.
        metadata: ArchiveMetadata,
    },
    /// Diagnostic output, only when debugging is enabled.
    Info {
        /// Human-readable message.
        message: String,
    },
    /// An unrecoverable failure; no further events follow.
    Error {
        /// Human-readable message.
        message: String,
    },
}

impl UnarchiveEvent {
    /// Name of the event kind, as used in the `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Append { .. } => "append",
            Self::Progress(_) => "progress",
            Self::Extract(_) => "extract",
            Self::Finish { .. } => "finish",
            Self::Info { .. } => "info",
            Self::Error { .. } => "error",
        }
    }

    /// Whether this event ends the sequence.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finish { .. } | Self::Error { .. })
    }
}

/// Events produced while compressing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompressEvent {
    /// The first batch of files was accepted.
    Start,
    /// The next slice of the archive. Concatenating every payload in
    /// order yields the complete archive.
    Compress {
        /// Archive bytes.
        #[serde(rename = "num_bytes", serialize_with = "serialize_len")]
        bytes: Vec<u8>,
    },
    /// The archive is complete.
    Finish,
    /// An unrecoverable failure.
    Error {
        /// Human-readable message.
        message: String,
    },
}

impl CompressEvent {
    /// Whether this event ends the sequence.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finish | Self::Error { .. })
    }
}
