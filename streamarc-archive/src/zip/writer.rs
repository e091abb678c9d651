//! STORE-only ZIP writer.
//!
//! Files arrive in batches. Each file becomes one local record emitted as
//! a `compress` event as soon as it is written; the central directory and
//! end record follow once the caller marks the last batch.

use super::header::{
    CENTRAL_DIR_HEADER_LEN, CENTRAL_DIR_HEADER_SIG, END_OF_CENTRAL_DIR_LEN, EndOfCentralDirectory,
    FLAG_UTF8, LOCAL_FILE_HEADER_LEN, LOCAL_FILE_HEADER_SIG, VERSION_STORE, dos_date, dos_time,
};
use crate::event::CompressEvent;
use crate::options::CompressOptions;
use std::time::SystemTime;
use streamarc_core::bytestream::ByteBuffer;
use streamarc_core::crc::Crc32;
use streamarc_core::error::{Result, StreamArcError};
use time::{OffsetDateTime, UtcOffset};

/// A file to add to an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Path of the entry inside the archive.
    pub file_name: String,
    /// Modification time; its offset decides the DOS wall-clock fields.
    pub last_mod_time: OffsetDateTime,
    /// Contents.
    pub file_data: Vec<u8>,
}

impl FileInfo {
    /// A file whose modification time is `modified` in the local time zone,
    /// or UTC when the local offset cannot be determined.
    pub fn new(file_name: impl Into<String>, file_data: Vec<u8>, modified: SystemTime) -> Self {
        let utc = OffsetDateTime::from(modified);
        let last_mod_time = match UtcOffset::current_local_offset() {
            Ok(offset) => utc.to_offset(offset),
            Err(_) => utc,
        };
        Self {
            file_name: file_name.into(),
            last_mod_time,
            file_data,
        }
    }
}

/// Lifecycle of a [`ZipWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressorState {
    /// No files received yet.
    NotStarted,
    /// Writing a batch.
    Compressing,
    /// Between batches.
    Waiting,
    /// Central directory written. Terminal.
    Finished,
}

/// Central directory information kept for each written entry.
#[derive(Debug, Clone)]
struct CentralDirectoryRecord {
    flags: u16,
    method: u16,
    mtime: u16,
    mdate: u16,
    crc32: u32,
    compressed_size: u32,
    uncompressed_size: u32,
    file_name: String,
    byte_offset: u32,
}

fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| StreamArcError::value_out_of_range(value as u64, 4))
}

/// Write a file name: ASCII as is, anything else as UTF-8 under the
/// UTF-8 flag.
fn write_name(buffer: &mut ByteBuffer, name: &str) -> Result<()> {
    if name.is_ascii() {
        buffer.write_ascii(name)
    } else {
        buffer.insert_bytes(name.as_bytes())
    }
}

/// Streaming STORE-only ZIP writer.
#[derive(Debug)]
pub struct ZipWriter {
    options: CompressOptions,
    state: CompressorState,
    entries: Vec<CentralDirectoryRecord>,
    bytes_written: u64,
}

impl ZipWriter {
    /// Create a writer.
    pub fn new(options: CompressOptions) -> Self {
        Self {
            options,
            state: CompressorState::NotStarted,
            entries: Vec::new(),
            bytes_written: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> CompressorState {
        self.state
    }

    /// Number of entries written so far.
    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    /// Archive bytes emitted so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Write a batch of files, emitting one `compress` event per file.
    ///
    /// The first batch is preceded by `start`. When `is_last` is set the
    /// central directory follows as a final `compress` event, then
    /// `finish`. Any call after that fails with
    /// [`StreamArcError::ProtocolMisuse`].
    pub fn append_files<F>(
        &mut self,
        files: Vec<FileInfo>,
        is_last: bool,
        mut sink: F,
    ) -> Result<CompressorState>
    where
        F: FnMut(CompressEvent),
    {
        if self.state == CompressorState::Finished {
            return Err(StreamArcError::protocol_misuse(
                "zip writer received files after the last file",
            ));
        }
        if self.state == CompressorState::NotStarted {
            sink(CompressEvent::Start);
        }
        self.state = CompressorState::Compressing;

        for file in files {
            let record = self.zip_one_file(&file)?;
            self.bytes_written += record.len() as u64;
            sink(CompressEvent::Compress { bytes: record });
        }

        if is_last {
            let central = self.write_central_directory()?;
            self.bytes_written += central.len() as u64;
            sink(CompressEvent::Compress { bytes: central });
            self.state = CompressorState::Finished;
            log::debug!(
                "zip finished: {} entries, {} bytes",
                self.entries.len(),
                self.bytes_written
            );
            sink(CompressEvent::Finish);
        } else {
            self.state = CompressorState::Waiting;
        }
        Ok(self.state)
    }

    /// Build the local record for one file and remember its directory entry.
    fn zip_one_file(&mut self, file: &FileInfo) -> Result<Vec<u8>> {
        let name_len = file.file_name.len();
        let data_len = file.file_data.len();
        let mut buffer = ByteBuffer::new(LOCAL_FILE_HEADER_LEN + name_len + data_len);

        let flags = if file.file_name.is_ascii() { 0 } else { FLAG_UTF8 };
        let size = to_u32(data_len)?;
        let record = CentralDirectoryRecord {
            flags,
            method: self.options.method.to_u16(),
            mtime: dos_time(&file.last_mod_time),
            mdate: dos_date(&file.last_mod_time),
            crc32: Crc32::compute(&file.file_data),
            compressed_size: size,
            uncompressed_size: size,
            file_name: file.file_name.clone(),
            byte_offset: u32::try_from(self.bytes_written)
                .map_err(|_| StreamArcError::value_out_of_range(self.bytes_written, 4))?,
        };

        buffer.write_u(u64::from(LOCAL_FILE_HEADER_SIG), 4)?;
        buffer.write_u(u64::from(VERSION_STORE), 2)?;
        buffer.write_u(u64::from(record.flags), 2)?;
        buffer.write_u(u64::from(record.method), 2)?;
        buffer.write_u(u64::from(record.mtime), 2)?;
        buffer.write_u(u64::from(record.mdate), 2)?;
        buffer.write_u(u64::from(record.crc32), 4)?;
        buffer.write_u(u64::from(record.compressed_size), 4)?;
        buffer.write_u(u64::from(record.uncompressed_size), 4)?;
        buffer.write_u(name_len as u64, 2)?;
        // Extra field length
        buffer.write_u(0, 2)?;
        write_name(&mut buffer, &file.file_name)?;
        buffer.insert_bytes(&file.file_data)?;

        log::debug!(
            "stored '{}' ({data_len} bytes, crc {:#010x}) at offset {}",
            file.file_name,
            record.crc32,
            record.byte_offset
        );
        self.entries.push(record);
        Ok(buffer.into_inner())
    }

    /// Build the central directory followed by the end record.
    fn write_central_directory(&self) -> Result<Vec<u8>> {
        let central_dir_size: usize = self
            .entries
            .iter()
            .map(|e| CENTRAL_DIR_HEADER_LEN + e.file_name.len())
            .sum();
        let mut buffer = ByteBuffer::new(central_dir_size + END_OF_CENTRAL_DIR_LEN);

        for entry in &self.entries {
            buffer.write_u(u64::from(CENTRAL_DIR_HEADER_SIG), 4)?;
            // Version made by
            buffer.write_u(u64::from(VERSION_STORE), 2)?;
            // Version needed
            buffer.write_u(u64::from(VERSION_STORE), 2)?;
            buffer.write_u(u64::from(entry.flags), 2)?;
            buffer.write_u(u64::from(entry.method), 2)?;
            buffer.write_u(u64::from(entry.mtime), 2)?;
            buffer.write_u(u64::from(entry.mdate), 2)?;
            buffer.write_u(u64::from(entry.crc32), 4)?;
            buffer.write_u(u64::from(entry.compressed_size), 4)?;
            buffer.write_u(u64::from(entry.uncompressed_size), 4)?;
            buffer.write_u(entry.file_name.len() as u64, 2)?;
            // Extra field, comment, disk number start, internal attributes
            buffer.write_u(0, 2)?;
            buffer.write_u(0, 2)?;
            buffer.write_u(0, 2)?;
            buffer.write_u(0, 2)?;
            // External attributes
            buffer.write_u(0, 4)?;
            buffer.write_u(u64::from(entry.byte_offset), 4)?;
            write_name(&mut buffer, &entry.file_name)?;
        }

        let num_entries = u16::try_from(self.entries.len())
            .map_err(|_| StreamArcError::value_out_of_range(self.entries.len() as u64, 2))?;
        EndOfCentralDirectory {
            disk_number: 0,
            central_dir_disk: 0,
            disk_entries: num_entries,
            total_entries: num_entries,
            central_dir_size: to_u32(central_dir_size)?,
            central_dir_offset: u32::try_from(self.bytes_written)
                .map_err(|_| StreamArcError::value_out_of_range(self.bytes_written, 4))?,
            comment: String::new(),
        }
        .write(&mut buffer)?;

        Ok(buffer.into_inner())
    }
}
