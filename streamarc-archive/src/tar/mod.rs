//! Streaming TAR reader.
//!
//! Reads 512-byte UStar headers (POSIX.1-1988) from an incrementally
//! filled stream, with support for:
//! - `prefix/name` joining for long UStar paths
//! - PAX extended headers (`path` only) and GNU long names
//!
//! A zero block ends the archive.

use crate::detect::MIME_TAR;
use crate::event::{ArchiveMetadata, ExtractedFile};
use crate::unarchiver::{ArchiveReader, ParseStep, UnarchiveContext};
use std::collections::HashMap;
use streamarc_core::bytestream::ByteStream;
use streamarc_core::error::{Result, StreamArcError};

/// TAR block size.
pub const BLOCK_SIZE: usize = 512;

/// PAX typeflag for extended header (applies to next file only).
const PAX_HEADER: u8 = b'x';

/// PAX typeflag for global extended header.
const PAX_GLOBAL_HEADER: u8 = b'g';

/// GNU LongName typeflag.
const GNU_LONGNAME: u8 = b'L';

/// TAR header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TarHeader {
    /// File name, prefix already joined.
    pub name: String,
    /// Raw name bytes as stored.
    pub name_raw: Vec<u8>,
    /// File mode.
    pub mode: u32,
    /// File size.
    pub size: u64,
    /// Modification time (Unix seconds).
    pub mtime: u64,
    /// Type flag.
    pub typeflag: u8,
    /// UStar indicator.
    pub ustar: bool,
}

impl TarHeader {
    /// Parse a header block. Returns `None` for a zero block.
    pub fn from_block(block: &[u8]) -> Result<Option<Self>> {
        if block.len() != BLOCK_SIZE {
            return Err(StreamArcError::invalid_header(format!(
                "TAR header must be {BLOCK_SIZE} bytes, got {}",
                block.len()
            )));
        }
        if block.iter().all(|&b| b == 0) {
            return Ok(None);
        }

        let stored = Self::parse_octal(&block[148..156])?;
        let computed = Self::checksum(block);
        if stored != computed {
            return Err(StreamArcError::invalid_header(format!(
                "TAR header checksum {stored:o} does not match computed {computed:o}"
            )));
        }

        let name = Self::field(&block[0..100]);
        let mode = Self::parse_octal(&block[100..108])? as u32;
        let size = Self::parse_octal(&block[124..136])?;
        let mtime = Self::parse_octal(&block[136..148])?;
        let typeflag = block[156];
        let ustar = &block[257..262] == b"ustar";

        let prefix: &[u8] = if ustar { Self::field(&block[345..500]) } else { &[] };
        let name_raw = if prefix.is_empty() {
            name.to_vec()
        } else {
            [prefix, b"/".as_slice(), name].concat()
        };

        Ok(Some(Self {
            name: String::from_utf8_lossy(&name_raw).into_owned(),
            name_raw,
            mode,
            size,
            mtime,
            typeflag,
            ustar,
        }))
    }

    /// Bytes of a null-terminated field.
    fn field(data: &[u8]) -> &[u8] {
        let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        &data[..end]
    }

    /// Parse an octal number padded with spaces or nulls.
    fn parse_octal(data: &[u8]) -> Result<u64> {
        let text = String::from_utf8_lossy(Self::field(data));
        let text = text.trim();
        if text.is_empty() {
            return Ok(0);
        }
        u64::from_str_radix(text, 8)
            .map_err(|_| StreamArcError::invalid_header(format!("Invalid octal: {text}")))
    }

    /// Header checksum: byte sum with the checksum field read as spaces.
    fn checksum(block: &[u8]) -> u64 {
        block
            .iter()
            .enumerate()
            .map(|(i, &b)| if (148..156).contains(&i) { 32 } else { u64::from(b) })
            .sum()
    }

    /// Whether the entry holds file contents.
    pub fn is_file(&self) -> bool {
        matches!(self.typeflag, b'0' | b'\0' | b'7')
    }

    /// Size rounded up to whole blocks.
    pub fn padded_size(&self) -> u64 {
        self.size.div_ceil(BLOCK_SIZE as u64) * BLOCK_SIZE as u64
    }

    /// Parse PAX extended header records (`"<len> <key>=<value>\n"`).
    pub fn parse_pax_data(data: &[u8]) -> HashMap<String, String> {
        let mut attrs = HashMap::new();
        let mut rest = data;
        while !rest.is_empty() {
            let Some(space) = rest.iter().position(|&b| b == b' ') else {
                break;
            };
            let Some(len) = std::str::from_utf8(&rest[..space])
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
            else {
                break;
            };
            if len <= space + 1 || len > rest.len() {
                break;
            }
            let record = &rest[space + 1..len];
            let record = record.strip_suffix(b"\n").unwrap_or(record);
            if let Some(eq) = record.iter().position(|&b| b == b'=') {
                let key = String::from_utf8_lossy(&record[..eq]).into_owned();
                let value = String::from_utf8_lossy(&record[eq + 1..]).into_owned();
                attrs.insert(key, value);
            }
            rest = &rest[len..];
        }
        attrs
    }
}

/// TAR implementation of [`ArchiveReader`].
#[derive(Debug, Default)]
pub struct Untarrer {
    files_extracted: usize,
    /// Name carried over from a PAX or GNU long-name record.
    pending_name: Option<Vec<u8>>,
}

impl Untarrer {
    /// Create a reader positioned before the first header.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArchiveReader for Untarrer {
    fn mime_type(&self) -> &'static str {
        MIME_TAR
    }

    fn parse_next_entry(
        &mut self,
        stream: &mut ByteStream,
        ctx: &mut UnarchiveContext<'_>,
    ) -> Result<ParseStep> {
        let block = stream.read_bytes(BLOCK_SIZE)?;
        let Some(mut header) = TarHeader::from_block(&block)? else {
            ctx.progress_mut().total_files = self.files_extracted;
            return Ok(ParseStep::Done(ArchiveMetadata::default()));
        };

        let size = usize::try_from(header.size)
            .map_err(|_| StreamArcError::invalid_header("TAR entry too large"))?;
        let data = stream.read_bytes(size)?;
        stream.skip((header.padded_size() - header.size) as usize)?;

        ctx.info(format!(
            "TAR header: name='{}' type='{}' size={} mode={:o} mtime={}",
            header.name,
            char::from(header.typeflag),
            header.size,
            header.mode,
            header.mtime
        ));

        match header.typeflag {
            PAX_HEADER => {
                if let Some(path) = TarHeader::parse_pax_data(&data).remove("path") {
                    self.pending_name = Some(path.into_bytes());
                }
                return Ok(ParseStep::Skipped);
            }
            GNU_LONGNAME => {
                self.pending_name = Some(data.split(|&b| b == 0).next().unwrap_or(&[]).to_vec());
                return Ok(ParseStep::Skipped);
            }
            PAX_GLOBAL_HEADER => return Ok(ParseStep::Skipped),
            _ => {}
        }

        if let Some(name) = self.pending_name.take() {
            header.name = String::from_utf8_lossy(&name).into_owned();
            header.name_raw = name;
        }
        if !header.is_file() {
            log::debug!("skipping TAR entry '{}' of type {}", header.name, header.typeflag);
            return Ok(ParseStep::Skipped);
        }

        self.files_extracted += 1;
        let progress = ctx.progress_mut();
        progress.current_filename = header.name.clone();
        progress.current_file_index = self.files_extracted - 1;
        progress.bytes_unarchived_in_file = header.size;
        progress.bytes_unarchived += header.size;
        progress.total_uncompressed_bytes += header.size;
        progress.total_files = self.files_extracted;

        Ok(ParseStep::Entry(ExtractedFile {
            filename: header.name,
            filename_raw_bytes: header.name_raw,
            compressed_size: header.size,
            file_data: data,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A UStar header block with a valid checksum.
    fn header_block(name: &str, size: usize, typeflag: u8) -> Vec<u8> {
        let mut block = vec![0u8; BLOCK_SIZE];
        block[..name.len()].copy_from_slice(name.as_bytes());
        block[100..107].copy_from_slice(b"0000644");
        block[108..115].copy_from_slice(b"0001750");
        block[116..123].copy_from_slice(b"0001750");
        block[124..135].copy_from_slice(format!("{size:011o}").as_bytes());
        block[136..147].copy_from_slice(b"14723456700");
        block[156] = typeflag;
        block[257..263].copy_from_slice(b"ustar\0");
        block[263..265].copy_from_slice(b"00");
        block[148..156].copy_from_slice(b"        ");
        let checksum: u32 = block.iter().map(|&b| u32::from(b)).sum();
        block[148..156].copy_from_slice(format!("{checksum:06o}\0 ").as_bytes());
        block
    }

    fn entry(name: &str, data: &[u8], typeflag: u8) -> Vec<u8> {
        let mut out = header_block(name, data.len(), typeflag);
        out.extend_from_slice(data);
        out.resize(out.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE, 0);
        out
    }

    #[test]
    fn test_parse_octal() {
        assert_eq!(TarHeader::parse_octal(b"0000644\0").unwrap(), 0o644);
        assert_eq!(TarHeader::parse_octal(b"   755 \0").unwrap(), 0o755);
        assert_eq!(TarHeader::parse_octal(b"\0\0\0\0").unwrap(), 0);
        assert!(TarHeader::parse_octal(b"12a").is_err());
    }

    #[test]
    fn test_header_from_block() {
        let block = header_block("test.txt", 13, b'0');
        let header = TarHeader::from_block(&block).unwrap().unwrap();
        assert_eq!(header.name, "test.txt");
        assert_eq!(header.size, 13);
        assert_eq!(header.mode, 0o644);
        assert!(header.ustar);
        assert!(header.is_file());
        assert_eq!(header.padded_size(), 512);
    }

    #[test]
    fn test_zero_block_and_bad_checksum() {
        assert_eq!(TarHeader::from_block(&[0u8; BLOCK_SIZE]).unwrap(), None);

        let mut block = header_block("test.txt", 13, b'0');
        block[0] = b'T';
        assert!(matches!(
            TarHeader::from_block(&block),
            Err(StreamArcError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_prefix_joined() {
        let mut block = header_block("file.txt", 0, b'0');
        block[345..352].copy_from_slice(b"a/b/dir");
        block[148..156].copy_from_slice(b"        ");
        let checksum: u32 = block.iter().map(|&b| u32::from(b)).sum();
        block[148..156].copy_from_slice(format!("{checksum:06o}\0 ").as_bytes());
        let header = TarHeader::from_block(&block).unwrap().unwrap();
        assert_eq!(header.name, "a/b/dir/file.txt");
    }

    #[test]
    fn test_parse_pax_data() {
        let attrs = TarHeader::parse_pax_data(b"32 path=some/very/long/name.txt\n20 mtime=1700000000\n");
        assert_eq!(attrs.get("path").map(String::as_str), Some("some/very/long/name.txt"));
        assert_eq!(attrs.get("mtime").map(String::as_str), Some("1700000000"));
    }

    #[test]
    fn test_untar_stream() {
        use crate::options::UnarchiveOptions;
        use crate::unarchiver::{UnarchiveState, Unarchiver};

        let mut archive = entry("dir/", b"", b'5');
        archive.extend(entry("dir/a.txt", b"Hello, TAR!\n", b'0'));
        archive.extend(entry("././@LongLink", b"dir/long-name.txt\0", GNU_LONGNAME));
        archive.extend(entry("dir/long-na", b"second", b'0'));
        archive.extend(vec![0u8; BLOCK_SIZE * 2]);

        let mut unarchiver = Unarchiver::new(Box::new(Untarrer::new()), UnarchiveOptions::default());
        let mut files = Vec::new();
        let mut state = UnarchiveState::NotStarted;
        for chunk in archive.chunks(300) {
            state = unarchiver
                .update(chunk.to_vec(), |event| {
                    if let crate::event::UnarchiveEvent::Extract(file) = event {
                        files.push((file.filename, file.file_data));
                    }
                })
                .unwrap();
            if state == UnarchiveState::Finished {
                break;
            }
        }
        assert_eq!(state, UnarchiveState::Finished);
        assert_eq!(
            files,
            vec![
                ("dir/a.txt".to_string(), b"Hello, TAR!\n".to_vec()),
                ("dir/long-name.txt".to_string(), b"second".to_vec()),
            ]
        );
        assert_eq!(unarchiver.progress().total_files, 2);
        assert_eq!(unarchiver.progress().bytes_unarchived, 18);
    }
}
