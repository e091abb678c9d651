//! Reader and writer configuration.

use serde::Serialize;

/// Options for an [`Unarchiver`](crate::unarchiver::Unarchiver).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnarchiveOptions {
    /// Emit `info` events describing every record parsed.
    pub debug: bool,
    /// Check the CRC-32 of each extracted ZIP entry.
    pub verify_crc: bool,
}

impl Default for UnarchiveOptions {
    fn default() -> Self {
        Self {
            debug: false,
            verify_crc: true,
        }
    }
}

impl UnarchiveOptions {
    /// Enable or disable debug `info` events.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Enable or disable CRC-32 verification.
    pub fn with_verify_crc(mut self, verify_crc: bool) -> Self {
        self.verify_crc = verify_crc;
        self
    }
}

/// Compression methods the ZIP writer can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZipCompressionMethod {
    /// No compression.
    #[default]
    Store,
}

impl ZipCompressionMethod {
    /// The method number written into ZIP headers.
    pub fn to_u16(self) -> u16 {
        match self {
            Self::Store => 0,
        }
    }
}

/// Options for a [`ZipWriter`](crate::zip::ZipWriter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompressOptions {
    /// Compression method for every entry.
    pub method: ZipCompressionMethod,
}
