//! ZIP record structures.
//!
//! Every record is read from a [`ByteStream`] that may not yet hold the
//! whole archive. Reads past the available bytes fail with
//! [`StreamArcError::Overflow`], which the caller treats as "wait for more
//! input" rather than as corruption.

use streamarc_core::bytestream::{ByteBuffer, ByteStream};
use streamarc_core::error::{Result, StreamArcError};
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};

/// ZIP local file header signature.
pub const LOCAL_FILE_HEADER_SIG: u32 = 0x04034B50;

/// ZIP archive extra data record signature.
pub const ARCHIVE_EXTRA_DATA_SIG: u32 = 0x08064B50;

/// ZIP central directory header signature.
pub const CENTRAL_DIR_HEADER_SIG: u32 = 0x02014B50;

/// ZIP digital signature record signature.
pub const DIGITAL_SIGNATURE_SIG: u32 = 0x05054B50;

/// ZIP end of central directory signature.
pub const END_OF_CENTRAL_DIR_SIG: u32 = 0x06054B50;

/// Data descriptor signature (optional, PK\x07\x08).
pub const DATA_DESCRIPTOR_SIG: u32 = 0x08074B50;

/// Flag bit for data descriptor presence.
pub const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;

/// Flag bit for UTF-8 file names.
pub const FLAG_UTF8: u16 = 0x0800;

/// Fixed part of a local file header, signature included.
pub const LOCAL_FILE_HEADER_LEN: usize = 30;

/// Fixed part of a central directory header, signature included.
pub const CENTRAL_DIR_HEADER_LEN: usize = 46;

/// Fixed part of the end of central directory record, signature included.
pub const END_OF_CENTRAL_DIR_LEN: usize = 22;

/// Version written by and needed for STORE entries (1.0).
pub const VERSION_STORE: u16 = 0x0A;

/// ZIP compression methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Stored (no compression).
    Stored,
    /// Deflate compression.
    Deflate,
    /// Unknown method.
    Unknown(u16),
}

impl CompressionMethod {
    /// Create from a u16 value.
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => Self::Stored,
            8 => Self::Deflate,
            _ => Self::Unknown(value),
        }
    }

    /// The method number.
    pub fn to_u16(self) -> u16 {
        match self {
            Self::Stored => 0,
            Self::Deflate => 8,
            Self::Unknown(id) => id,
        }
    }
}

impl std::fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stored => write!(f, "store"),
            Self::Deflate => write!(f, "deflate"),
            Self::Unknown(id) => write!(f, "method {id}"),
        }
    }
}

/// Decode an entry name: UTF-8 when the flag says so, otherwise one
/// char per byte.
pub fn decode_filename(raw: &[u8], flags: u16) -> String {
    if flags & FLAG_UTF8 != 0 {
        String::from_utf8_lossy(raw).into_owned()
    } else {
        raw.iter().copied().map(char::from).collect()
    }
}

fn read_u16(stream: &mut ByteStream) -> Result<u16> {
    Ok(stream.read_u(2)? as u16)
}

fn read_u32(stream: &mut ByteStream) -> Result<u32> {
    Ok(stream.read_u(4)? as u32)
}

/// A ZIP local file record, header plus the entry's compressed bytes.
#[derive(Debug, Clone)]
pub struct LocalFileHeader {
    /// Minimum version needed to extract.
    pub version_needed: u16,
    /// General purpose bit flag.
    pub flags: u16,
    /// Compression method.
    pub method: CompressionMethod,
    /// Last modification time (DOS format).
    pub mtime: u16,
    /// Last modification date (DOS format).
    pub mdate: u16,
    /// CRC-32 of uncompressed data.
    pub crc32: u32,
    /// Compressed size.
    pub compressed_size: u32,
    /// Uncompressed size.
    pub uncompressed_size: u32,
    /// Decoded file name.
    pub filename: String,
    /// File name bytes as stored.
    pub filename_raw: Vec<u8>,
    /// Extra field.
    pub extra: Vec<u8>,
    /// Compressed file data.
    pub data: Vec<u8>,
    /// Length of the trailing data descriptor (0, 12 or 16).
    pub descriptor_len: usize,
}

impl LocalFileHeader {
    /// Read one local file record, including its data and any trailing
    /// data descriptor.
    ///
    /// On success `stream` is positioned after the record. On any error,
    /// including overflow, the caller must discard `stream`: it may have
    /// been advanced part way.
    pub fn read(stream: &mut ByteStream) -> Result<Self> {
        Self::read_resuming(stream, &mut DescriptorScan::default())
    }

    /// Like [`LocalFileHeader::read`], carrying descriptor search progress
    /// in `scan` between attempts on the same entry.
    pub fn read_resuming(stream: &mut ByteStream, scan: &mut DescriptorScan) -> Result<Self> {
        let signature = read_u32(stream)?;
        if signature != LOCAL_FILE_HEADER_SIG {
            return Err(StreamArcError::invalid_header(format!(
                "expected local file header, found signature {signature:#010x}"
            )));
        }

        let version_needed = read_u16(stream)?;
        let flags = read_u16(stream)?;
        let method = CompressionMethod::from_u16(read_u16(stream)?);
        let mtime = read_u16(stream)?;
        let mdate = read_u16(stream)?;
        let crc32 = read_u32(stream)?;
        let compressed_size = read_u32(stream)?;
        let uncompressed_size = read_u32(stream)?;
        let filename_len = read_u16(stream)? as usize;
        let extra_len = read_u16(stream)? as usize;

        let filename_raw = stream.read_bytes(filename_len)?;
        let filename = decode_filename(&filename_raw, flags);
        let extra = stream.read_bytes(extra_len)?;

        let mut header = Self {
            version_needed,
            flags,
            method,
            mtime,
            mdate,
            crc32,
            compressed_size,
            uncompressed_size,
            filename,
            filename_raw,
            extra,
            data: Vec::new(),
            descriptor_len: 0,
        };

        if header.has_data_descriptor() {
            if crc32 != 0 || compressed_size != 0 || uncompressed_size != 0 {
                log::warn!(
                    "{}: data descriptor flagged but header carries crc={crc32:#010x} \
                     compressed={compressed_size} uncompressed={uncompressed_size}",
                    header.filename
                );
            }
            let descriptor = DataDescriptor::locate_from(stream, scan)?;
            header.crc32 = descriptor.crc32;
            header.compressed_size = descriptor.compressed_size;
            header.uncompressed_size = descriptor.uncompressed_size;
            header.descriptor_len = descriptor.len;
        }

        header.data = stream.read_bytes(header.compressed_size as usize)?;
        stream.skip(header.descriptor_len)?;
        Ok(header)
    }

    /// Check if this entry has a data descriptor following the compressed data.
    pub fn has_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }

    /// Last modification time, if the DOS fields hold a valid date.
    pub fn modified(&self) -> Option<PrimitiveDateTime> {
        from_dos(self.mdate, self.mtime)
    }

    /// One line per header field, for debug output.
    pub fn describe(&self) -> Vec<String> {
        vec![
            "local file header:".to_string(),
            format!(" version={}", self.version_needed),
            format!(" general purpose={}", self.flags),
            format!(" compression method={}", self.method.to_u16()),
            format!(" last mod file time={}", self.mtime),
            format!(" last mod file date={}", self.mdate),
            format!(" crc32={}", self.crc32),
            format!(" compressed size={}", self.compressed_size),
            format!(" uncompressed size={}", self.uncompressed_size),
            format!(" file name length={}", self.filename_raw.len()),
            format!(" extra field length={}", self.extra.len()),
            format!(" file name='{}'", self.filename),
            format!(" data descriptor={}", self.has_data_descriptor()),
        ]
    }
}

/// Values recovered from a data descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataDescriptor {
    /// CRC-32 of uncompressed data.
    pub crc32: u32,
    /// Compressed size.
    pub compressed_size: u32,
    /// Uncompressed size.
    pub uncompressed_size: u32,
    /// Bytes the descriptor occupies: 16 with signature, 12 without.
    pub len: usize,
}

/// How far a descriptor search has got for the entry whose data starts at
/// a given stream offset.
///
/// A search that runs out of input before finding its boundary records the
/// offset it reached, so the next attempt on the same entry only scans the
/// newly arrived bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DescriptorScan {
    data_start: u64,
    checked: usize,
}

impl DescriptorScan {
    /// Offset into the entry data where scanning resumes.
    fn resume_at(&mut self, data_start: u64) -> usize {
        if self.data_start != data_start {
            self.data_start = data_start;
            self.checked = 0;
        }
        self.checked
    }
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

impl DataDescriptor {
    /// Find the descriptor that follows entry data starting at `stream`.
    ///
    /// Descriptors are not self-delimiting, so this scans ahead for the next
    /// local header, archive extra data record or central directory header,
    /// then checks whether the bytes just before that boundary form a
    /// descriptor whose compressed size equals the bytes scanned. A boundary
    /// that fails the check is stepped over and the scan goes on. `stream`
    /// itself is not moved.
    pub fn locate(stream: &ByteStream) -> Result<Self> {
        Self::locate_from(stream, &mut DescriptorScan::default())
    }

    /// Like [`DataDescriptor::locate`], resuming from `scan` when it belongs
    /// to the same entry and recording progress in it on overflow.
    pub fn locate_from(stream: &ByteStream, scan: &mut DescriptorScan) -> Result<Self> {
        let checked = scan.resume_at(stream.bytes_read());
        // Keep the 16 bytes before the first unchecked boundary for the
        // descriptor itself.
        let window_start = checked.saturating_sub(16);
        let mut cursor = stream.tee();
        cursor.skip(window_start)?;
        let window = cursor.peek_bytes(cursor.bytes_left())?;
        let total = window_start + window.len();

        for pos in checked..total.saturating_sub(3) {
            let at = pos - window_start;
            if !matches!(
                le_u32(&window, at),
                LOCAL_FILE_HEADER_SIG | ARCHIVE_EXTRA_DATA_SIG | CENTRAL_DIR_HEADER_SIG
            ) {
                continue;
            }
            if let Some(descriptor) = Self::check_boundary(&window[..at], pos) {
                log::debug!(
                    "data descriptor found after {pos} bytes ({} byte form)",
                    descriptor.len
                );
                return Ok(descriptor);
            }
            log::debug!("boundary after {pos} bytes is not preceded by a descriptor");
        }

        scan.checked = checked.max(total.saturating_sub(3));
        log::trace!("no data descriptor within {total} bytes, waiting for more input");
        Err(StreamArcError::overflow(scan.checked + 4, total))
    }

    /// Check whether the bytes ending `before` are a descriptor for exactly
    /// `scanned` bytes of data. `before` holds at least the last
    /// `min(scanned, 16)` bytes before the boundary.
    fn check_boundary(before: &[u8], scanned: usize) -> Option<Self> {
        if scanned < 12 {
            return None;
        }
        let end = before.len();
        let has_signature = scanned >= 16 && le_u32(before, end - 16) == DATA_DESCRIPTOR_SIG;
        let crc32 = le_u32(before, end - 12);
        let compressed_size = le_u32(before, end - 8);
        let uncompressed_size = le_u32(before, end - 4);

        let len = if has_signature { 16 } else { 12 };
        if compressed_size as usize != scanned - len {
            return None;
        }
        Some(Self {
            crc32,
            compressed_size,
            uncompressed_size,
            len,
        })
    }
}

/// A central directory file header. Extraction never needs these; they
/// are parsed to move past them and for debug output.
#[derive(Debug, Clone)]
pub struct CentralDirectoryHeader {
    /// Version made by.
    pub version_made_by: u16,
    /// Version needed to extract.
    pub version_needed: u16,
    /// General purpose bit flag.
    pub flags: u16,
    /// Compression method.
    pub method: u16,
    /// Last modification time (DOS format).
    pub mtime: u16,
    /// Last modification date (DOS format).
    pub mdate: u16,
    /// CRC-32 of uncompressed data.
    pub crc32: u32,
    /// Compressed size.
    pub compressed_size: u32,
    /// Uncompressed size.
    pub uncompressed_size: u32,
    /// Disk number start.
    pub disk_start: u16,
    /// Internal file attributes.
    pub internal_attr: u16,
    /// External file attributes.
    pub external_attr: u32,
    /// Relative offset of local header.
    pub local_header_offset: u32,
    /// Decoded file name.
    pub filename: String,
    /// Extra field.
    pub extra: Vec<u8>,
    /// File comment.
    pub comment: String,
}

impl CentralDirectoryHeader {
    /// Read one central directory header, signature included.
    pub fn read(stream: &mut ByteStream) -> Result<Self> {
        stream.skip(4)?;
        let version_made_by = read_u16(stream)?;
        let version_needed = read_u16(stream)?;
        let flags = read_u16(stream)?;
        let method = read_u16(stream)?;
        let mtime = read_u16(stream)?;
        let mdate = read_u16(stream)?;
        let crc32 = read_u32(stream)?;
        let compressed_size = read_u32(stream)?;
        let uncompressed_size = read_u32(stream)?;
        let filename_len = read_u16(stream)? as usize;
        let extra_len = read_u16(stream)? as usize;
        let comment_len = read_u16(stream)? as usize;
        let disk_start = read_u16(stream)?;
        let internal_attr = read_u16(stream)?;
        let external_attr = read_u32(stream)?;
        let local_header_offset = read_u32(stream)?;
        let filename = decode_filename(&stream.read_bytes(filename_len)?, flags);
        let extra = stream.read_bytes(extra_len)?;
        let comment = decode_filename(&stream.read_bytes(comment_len)?, flags);

        Ok(Self {
            version_made_by,
            version_needed,
            flags,
            method,
            mtime,
            mdate,
            crc32,
            compressed_size,
            uncompressed_size,
            disk_start,
            internal_attr,
            external_attr,
            local_header_offset,
            filename,
            extra,
            comment,
        })
    }

    /// One line per header field, for debug output.
    pub fn describe(&self) -> Vec<String> {
        vec![
            "central directory header:".to_string(),
            format!(" version made by={}", self.version_made_by),
            format!(" version needed={}", self.version_needed),
            format!(" general purpose={}", self.flags),
            format!(" compression method={}", self.method),
            format!(" last mod file time={}", self.mtime),
            format!(" last mod file date={}", self.mdate),
            format!(" crc32={}", self.crc32),
            format!(" compressed size={}", self.compressed_size),
            format!(" uncompressed size={}", self.uncompressed_size),
            format!(" disk number start={}", self.disk_start),
            format!(" internal attributes={}", self.internal_attr),
            format!(" external attributes={}", self.external_attr),
            format!(" local header offset={}", self.local_header_offset),
            format!(" file name='{}'", self.filename),
            format!(" comment='{}'", self.comment),
        ]
    }
}

/// The end of central directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    /// Number of this disk.
    pub disk_number: u16,
    /// Disk where the central directory starts.
    pub central_dir_disk: u16,
    /// Central directory records on this disk.
    pub disk_entries: u16,
    /// Total central directory records.
    pub total_entries: u16,
    /// Size of the central directory in bytes.
    pub central_dir_size: u32,
    /// Offset of the start of the central directory.
    pub central_dir_offset: u32,
    /// Archive comment.
    pub comment: String,
}

impl EndOfCentralDirectory {
    /// Read the record, signature included.
    pub fn read(stream: &mut ByteStream) -> Result<Self> {
        stream.skip(4)?;
        let disk_number = read_u16(stream)?;
        let central_dir_disk = read_u16(stream)?;
        let disk_entries = read_u16(stream)?;
        let total_entries = read_u16(stream)?;
        let central_dir_size = read_u32(stream)?;
        let central_dir_offset = read_u32(stream)?;
        let comment_len = read_u16(stream)? as usize;
        let comment = stream.read_string(comment_len)?;

        Ok(Self {
            disk_number,
            central_dir_disk,
            disk_entries,
            total_entries,
            central_dir_size,
            central_dir_offset,
            comment,
        })
    }

    /// Write the record.
    pub fn write(&self, buffer: &mut ByteBuffer) -> Result<()> {
        buffer.write_u(u64::from(END_OF_CENTRAL_DIR_SIG), 4)?;
        buffer.write_u(u64::from(self.disk_number), 2)?;
        buffer.write_u(u64::from(self.central_dir_disk), 2)?;
        buffer.write_u(u64::from(self.disk_entries), 2)?;
        buffer.write_u(u64::from(self.total_entries), 2)?;
        buffer.write_u(u64::from(self.central_dir_size), 4)?;
        buffer.write_u(u64::from(self.central_dir_offset), 4)?;
        buffer.write_u(self.comment.len() as u64, 2)?;
        buffer.write_ascii(&self.comment)
    }

    /// One line per field, for debug output.
    pub fn describe(&self) -> Vec<String> {
        vec![
            "end of central directory:".to_string(),
            format!(" disk number={}", self.disk_number),
            format!(" central directory disk={}", self.central_dir_disk),
            format!(" entries on disk={}", self.disk_entries),
            format!(" total entries={}", self.total_entries),
            format!(" central directory size={}", self.central_dir_size),
            format!(" central directory offset={}", self.central_dir_offset),
            format!(" comment='{}'", self.comment),
        ]
    }
}

/// Years a DOS date can hold.
const DOS_YEARS: std::ops::RangeInclusive<i32> = 1980..=2107;

/// DOS date: day | month << 5 | (year - 1980) << 9.
///
/// Dates before 1980 become 1980-01-01 and dates after 2107 become
/// 2107-12-31.
pub fn dos_date(datetime: &OffsetDateTime) -> u16 {
    let (year, month, day) = match datetime.year() {
        y if y < *DOS_YEARS.start() => (0, 1, 1),
        y if y > *DOS_YEARS.end() => (127, 12, 31),
        y => (
            (y - 1980) as u16,
            u16::from(u8::from(datetime.month())),
            u16::from(datetime.day()),
        ),
    };
    day | (month << 5) | (year << 9)
}

/// DOS time: seconds / 2 | minutes << 5 | hours << 11.
///
/// Clamped like [`dos_date`]: 00:00:00 before 1980 and 23:59:58 after 2107.
pub fn dos_time(datetime: &OffsetDateTime) -> u16 {
    let (hour, minute, second) = match datetime.year() {
        y if y < *DOS_YEARS.start() => (0, 0, 0),
        y if y > *DOS_YEARS.end() => (23, 59, 58),
        _ => (datetime.hour(), datetime.minute(), datetime.second()),
    };
    u16::from(second) / 2 | (u16::from(minute) << 5) | (u16::from(hour) << 11)
}

/// Decode DOS date and time fields.
pub fn from_dos(date: u16, time: u16) -> Option<PrimitiveDateTime> {
    let year = i32::from(date >> 9) + 1980;
    let month = Month::try_from(((date >> 5) & 0x0F) as u8).ok()?;
    let day = (date & 0x1F) as u8;
    let date = Date::from_calendar_date(year, month, day).ok()?;

    let hour = (time >> 11) as u8;
    let minute = ((time >> 5) & 0x3F) as u8;
    let second = ((time & 0x1F) * 2) as u8;
    let time = Time::from_hms(hour, minute, second).ok()?;
    Some(PrimitiveDateTime::new(date, time))
}
