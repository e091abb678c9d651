//! Streaming ZIP reader.
//!
//! Entries are read front to back from their local headers; the central
//! directory is only walked once the local entries run out. Sizes come
//! from the local header or, for entries written to an unseekable stream,
//! from the recovered data descriptor.

use super::header::{
    ARCHIVE_EXTRA_DATA_SIG, CENTRAL_DIR_HEADER_SIG, CentralDirectoryHeader, CompressionMethod,
    DIGITAL_SIGNATURE_SIG, DescriptorScan, END_OF_CENTRAL_DIR_SIG, EndOfCentralDirectory, LOCAL_FILE_HEADER_SIG,
    LocalFileHeader,
};
use crate::detect::MIME_ZIP;
use crate::event::{ArchiveMetadata, ExtractedFile};
use crate::unarchiver::{ArchiveReader, ParseStep, UnarchiveContext};
use streamarc_core::bytestream::ByteStream;
use streamarc_core::crc::Crc32;
use streamarc_core::error::{Result, StreamArcError};
use streamarc_deflate::Inflater;

/// ZIP implementation of [`ArchiveReader`].
#[derive(Debug, Default)]
pub struct Unzipper {
    files_extracted: usize,
    descriptor_scan: DescriptorScan,
}

impl Unzipper {
    /// Create a reader positioned before the first local header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn a fully read local record into file contents, updating the
    /// per-file progress counters.
    fn unzip(&self, header: LocalFileHeader, ctx: &mut UnarchiveContext<'_>) -> Result<Vec<u8>> {
        let data = match header.method {
            CompressionMethod::Stored => {
                ctx.info(format!(
                    "ZIP v{}, store only: {} ({} bytes)",
                    header.version_needed, header.filename, header.compressed_size
                ));
                let progress = ctx.progress_mut();
                progress.bytes_unarchived_in_file = u64::from(header.compressed_size);
                progress.bytes_unarchived += u64::from(header.compressed_size);
                header.data
            }
            CompressionMethod::Deflate => {
                ctx.info(format!(
                    "ZIP v2.0, DEFLATE: {} ({} bytes)",
                    header.filename, header.compressed_size
                ));
                Inflater::with_size_hint(&header.data, header.uncompressed_size as usize)
                    .inflate_with(|block| {
                        log::trace!(
                            "{}: {} block, {} bytes",
                            header.filename,
                            block.block_type,
                            block.block_bytes
                        );
                        let progress = ctx.progress_mut();
                        progress.bytes_unarchived_in_file += block.block_bytes as u64;
                        progress.bytes_unarchived += block.block_bytes as u64;
                        ctx.post_progress();
                    })?
            }
            CompressionMethod::Unknown(_) => {
                return Err(StreamArcError::unsupported_method(format!(
                    "ZIP v{}, compression method={}: {} ({} bytes)",
                    header.version_needed,
                    header.method.to_u16(),
                    header.filename,
                    header.compressed_size
                )));
            }
        };

        let computed = Crc32::compute(&data);
        if computed != header.crc32 {
            if ctx.options().verify_crc {
                return Err(StreamArcError::crc_mismatch(header.crc32, computed));
            }
            log::warn!(
                "{}: CRC mismatch (expected {:#010x}, computed {computed:#010x})",
                header.filename,
                header.crc32
            );
        }
        Ok(data)
    }

    /// Read everything after the last local entry.
    fn read_trailer(
        &self,
        stream: &mut ByteStream,
        ctx: &mut UnarchiveContext<'_>,
    ) -> Result<ArchiveMetadata> {
        if stream.peek_u(4)? as u32 == ARCHIVE_EXTRA_DATA_SIG {
            ctx.info(" Found an Archive Extra Data Signature");
            stream.skip(4)?;
            let length = stream.read_u(4)? as usize;
            stream.skip(length)?;
        }

        if stream.peek_u(4)? as u32 == CENTRAL_DIR_HEADER_SIG {
            ctx.info(" Found a Central File Header");
            while stream.peek_u(4)? as u32 == CENTRAL_DIR_HEADER_SIG {
                let header = CentralDirectoryHeader::read(stream)?;
                ctx.info_lines(header.describe());
            }
        }

        if stream.peek_u(4)? as u32 == DIGITAL_SIGNATURE_SIG {
            ctx.info(" Found a Digital Signature");
            stream.skip(4)?;
            let length = stream.read_u(2)? as usize;
            stream.skip(length)?;
        }

        let mut metadata = ArchiveMetadata::default();
        if stream.peek_u(4)? as u32 == END_OF_CENTRAL_DIR_SIG {
            let eocd = EndOfCentralDirectory::read(stream)?;
            ctx.info_lines(eocd.describe());
            metadata.comment = Some(eocd.comment);
        }
        Ok(metadata)
    }
}

impl ArchiveReader for Unzipper {
    fn mime_type(&self) -> &'static str {
        MIME_ZIP
    }

    fn parse_next_entry(
        &mut self,
        stream: &mut ByteStream,
        ctx: &mut UnarchiveContext<'_>,
    ) -> Result<ParseStep> {
        if stream.peek_u(4)? as u32 != LOCAL_FILE_HEADER_SIG {
            ctx.progress_mut().total_files = self.files_extracted;
            let metadata = self.read_trailer(stream, ctx)?;
            return Ok(ParseStep::Done(metadata));
        }

        let header = LocalFileHeader::read_resuming(stream, &mut self.descriptor_scan)?;
        ctx.info_lines(header.describe());

        // Directories and empty files produce no output.
        if header.uncompressed_size == 0 {
            log::debug!("skipping empty entry '{}'", header.filename);
            return Ok(ParseStep::Skipped);
        }

        let filename = header.filename.clone();
        let filename_raw_bytes = header.filename_raw.clone();
        let compressed_size = u64::from(header.compressed_size);

        self.files_extracted += 1;
        let progress = ctx.progress_mut();
        progress.total_uncompressed_bytes += u64::from(header.uncompressed_size);
        progress.current_filename = filename.clone();
        progress.current_file_index = self.files_extracted - 1;
        progress.bytes_unarchived_in_file = 0;
        progress.total_compressed_bytes_read = stream.bytes_read();

        let file_data = self.unzip(header, ctx)?;
        Ok(ParseStep::Entry(ExtractedFile {
            filename,
            filename_raw_bytes,
            compressed_size,
            file_data,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ProgressInfo, UnarchiveEvent};
    use crate::options::UnarchiveOptions;

    fn stored_entry(name: &str, data: &[u8], crc: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&LOCAL_FILE_HEADER_SIG.to_le_bytes());
        out.extend_from_slice(&10u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(data);
        out
    }

    fn parse(bytes: Vec<u8>, options: UnarchiveOptions) -> (Result<ParseStep>, Vec<UnarchiveEvent>) {
        let mut progress = ProgressInfo::default();
        let mut events = Vec::new();
        let mut sink = |e: UnarchiveEvent| events.push(e);
        let mut ctx = UnarchiveContext::new(&options, &mut progress, &mut sink);
        let mut stream = ByteStream::new(bytes);
        let step = Unzipper::new().parse_next_entry(&mut stream, &mut ctx);
        drop(ctx);
        (step, events)
    }

    #[test]
    fn test_stored_entry() {
        let bytes = stored_entry("hello.txt", b"hello world", 0x0D4A1185);
        let (step, _) = parse(bytes, UnarchiveOptions::default());
        match step.unwrap() {
            ParseStep::Entry(file) => {
                assert_eq!(file.filename, "hello.txt");
                assert_eq!(file.file_data, b"hello world");
                assert_eq!(file.compressed_size, 11);
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_crc_mismatch() {
        let bytes = stored_entry("hello.txt", b"hello world", 0xDEADBEEF);
        let (step, _) = parse(bytes.clone(), UnarchiveOptions::default());
        assert!(matches!(step, Err(StreamArcError::CrcMismatch { .. })));

        let (step, _) = parse(bytes, UnarchiveOptions::default().with_verify_crc(false));
        assert!(matches!(step, Ok(ParseStep::Entry(_))));
    }

    #[test]
    fn test_directory_skipped() {
        let bytes = stored_entry("dir/", b"", 0);
        let (step, _) = parse(bytes, UnarchiveOptions::default());
        assert!(matches!(step, Ok(ParseStep::Skipped)));
    }

    #[test]
    fn test_unsupported_method() {
        let mut bytes = stored_entry("a.bz2", b"BZh91AY", 0);
        bytes[8] = 12;
        let (step, _) = parse(bytes, UnarchiveOptions::default());
        match step {
            Err(StreamArcError::UnsupportedMethod { method }) => {
                assert!(method.contains("compression method=12"));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_deflate_entry_reports_block_progress() {
        // "hello hello hello" as a single fixed block
        let data = [0xcb, 0x48, 0xcd, 0xc9, 0xc9, 0x57, 0xc8, 0x40, 0x90, 0x00];
        let crc = Crc32::compute(b"hello hello hello");
        let mut bytes = stored_entry("h.txt", &data, crc);
        bytes[8] = 8;
        // uncompressed size
        bytes[22..26].copy_from_slice(&17u32.to_le_bytes());

        let (step, events) = parse(bytes, UnarchiveOptions::default());
        let ParseStep::Entry(file) = step.unwrap() else {
            panic!("expected an entry");
        };
        assert_eq!(file.file_data, b"hello hello hello");
        let Some(UnarchiveEvent::Progress(progress)) = events.last() else {
            panic!("expected block progress");
        };
        assert_eq!(progress.bytes_unarchived_in_file, 17);
        assert_eq!(progress.current_filename, "h.txt");
    }

    #[test]
    fn test_trailer_metadata() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&END_OF_CENTRAL_DIR_SIG.to_le_bytes());
        bytes.extend_from_slice(&[0; 16]);
        bytes.extend_from_slice(&5u16.to_le_bytes());
        bytes.extend_from_slice(b"notes");
        let (step, _) = parse(bytes, UnarchiveOptions::default());
        match step.unwrap() {
            ParseStep::Done(metadata) => assert_eq!(metadata.comment.as_deref(), Some("notes")),
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_debug_dumps_headers() {
        let bytes = stored_entry("hello.txt", b"hello world", 0x0D4A1185);
        let (_, events) = parse(bytes, UnarchiveOptions::default().with_debug(true));
        assert!(events.iter().any(|e| matches!(
            e,
            UnarchiveEvent::Info { message } if message.contains("file name='hello.txt'")
        )));
    }
}
