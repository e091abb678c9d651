//! # streamarc archive
//!
//! Streaming archive readers and a STORE-only ZIP writer.
//!
//! Archive bytes may arrive in any number of chunks. An [`Unarchiver`]
//! extracts every entry the bytes received so far make available, parks in
//! [`UnarchiveState::Waiting`] when it runs out, and resumes from the same
//! position when the next chunk is appended. Results are reported as an
//! ordered sequence of [`UnarchiveEvent`]s.
//!
//! - **ZIP**: STORE and DEFLATE entries, data-descriptor recovery for
//!   entries written to unseekable streams, central directory and comment
//! - **TAR**: ustar headers with PAX and GNU long names
//! - **RAR**: recognised, not decoded
//!
//! ## Example
//!
//! ```rust,no_run
//! use streamarc_archive::{UnarchiveEvent, UnarchiveOptions, get_unarchiver};
//!
//! let bytes = std::fs::read("archive.zip").unwrap();
//! let (first, rest) = bytes.split_at(64);
//! let mut unarchiver = get_unarchiver(first, UnarchiveOptions::default())
//!     .unwrap()
//!     .expect("at least 10 bytes");
//! for chunk in [first, rest] {
//!     unarchiver
//!         .update(chunk.to_vec(), |event| {
//!             if let UnarchiveEvent::Extract(file) = event {
//!                 println!("{} ({} bytes)", file.filename, file.file_data.len());
//!             }
//!         })
//!         .unwrap();
//! }
//! ```
//!
//! The same readers and the [`ZipWriter`] can run on a worker thread
//! through [`UnarchiverHandle`] and [`ZipperHandle`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod detect;
pub mod event;
pub mod options;
pub mod tar;
pub mod unarchiver;
pub mod worker;
pub mod zip;

// Re-exports
pub use detect::{ArchiveFormat, Sniffer, find_mime_type};
pub use event::{ArchiveMetadata, CompressEvent, ExtractedFile, ProgressInfo, UnarchiveEvent};
pub use options::{CompressOptions, UnarchiveOptions, ZipCompressionMethod};
pub use tar::{TarHeader, Untarrer};
pub use unarchiver::{
    ArchiveReader, ParseStep, UnarchiveContext, UnarchiveState, Unarchiver, get_unarchiver,
};
pub use worker::{CompressStatus, UnarchiverHandle, ZipperHandle};
pub use zip::{CompressorState, FileInfo, LocalFileHeader, Unzipper, ZipWriter};
