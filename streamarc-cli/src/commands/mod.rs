//! Command implementations for the streamarc CLI.

pub mod create;
pub mod detect;
pub mod extract;
pub mod list;

pub use create::cmd_create;
pub use detect::cmd_detect;
pub use extract::{ExtractOptions, cmd_extract};
pub use list::{ListOptions, cmd_list};

use std::fs::File;
use std::io::Read;
use std::path::Path;
use streamarc_archive::unarchiver::MIN_SNIFF_LEN;
use streamarc_archive::{UnarchiveEvent, UnarchiveOptions, UnarchiveState, get_unarchiver};

/// How an archive file is fed to the unarchiver.
#[derive(Debug, Clone, Copy)]
pub struct StreamOptions {
    /// Bytes read per update.
    pub chunk_size: usize,
    /// Verify entry CRC-32 values.
    pub verify_crc: bool,
    /// Emit parser diagnostics as info events.
    pub debug: bool,
}

/// Read up to `len` bytes, fewer only at end of file.
fn read_chunk(file: &mut File, len: usize) -> std::io::Result<Vec<u8>> {
    let mut chunk = Vec::with_capacity(len);
    file.by_ref().take(len as u64).read_to_end(&mut chunk)?;
    Ok(chunk)
}

/// Feed `archive` to an unarchiver chunk by chunk, handing every event to
/// `on_event`. Fails if the file ends before the archive does.
pub fn stream_archive<F>(
    archive: &Path,
    options: StreamOptions,
    mut on_event: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnMut(UnarchiveEvent),
{
    let mut file = File::open(archive)?;
    let first = read_chunk(&mut file, options.chunk_size.max(MIN_SNIFF_LEN))?;

    let unarchive_options = UnarchiveOptions::default()
        .with_debug(options.debug)
        .with_verify_crc(options.verify_crc);
    let mut unarchiver = get_unarchiver(&first, unarchive_options)?
        .ok_or_else(|| format!("{} is too short to be an archive", archive.display()))?;
    log::debug!("{}: {}", archive.display(), unarchiver.mime_type());

    let mut state = unarchiver.update(first, &mut on_event)?;
    while state != UnarchiveState::Finished {
        let chunk = read_chunk(&mut file, options.chunk_size)?;
        if chunk.is_empty() {
            return Err(format!(
                "archive truncated: {} ended after {} bytes",
                archive.display(),
                unarchiver.progress().total_compressed_bytes_read
            )
            .into());
        }
        state = unarchiver.update(chunk, &mut on_event)?;
    }
    Ok(())
}
