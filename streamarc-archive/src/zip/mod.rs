//! ZIP archive format support.
//!
//! This module provides streaming reading of ZIP archives (STORE and
//! DEFLATE entries, including entries whose sizes trail their data in a
//! data descriptor) and STORE-only writing, as specified in the PKWARE
//! APPNOTE.

mod header;
mod reader;
mod writer;

pub use header::{
    CentralDirectoryHeader, CompressionMethod, DataDescriptor, DescriptorScan,
    EndOfCentralDirectory, LocalFileHeader, decode_filename, dos_date, dos_time, from_dos,
};
pub use reader::Unzipper;
pub use writer::{CompressorState, FileInfo, ZipWriter};

/// Signature constants for ZIP records.
pub mod signatures {
    pub use super::header::{
        ARCHIVE_EXTRA_DATA_SIG, CENTRAL_DIR_HEADER_SIG, DATA_DESCRIPTOR_SIG,
        DIGITAL_SIGNATURE_SIG, END_OF_CENTRAL_DIR_SIG, FLAG_DATA_DESCRIPTOR, FLAG_UTF8,
        LOCAL_FILE_HEADER_SIG,
    };
}
