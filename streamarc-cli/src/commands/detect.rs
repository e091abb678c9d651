//! Detect command implementation.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use streamarc_archive::ArchiveFormat;
use streamarc_archive::detect::builtin_sniffer;

pub fn cmd_detect(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let sniffer = builtin_sniffer()?;
    let mut magic = Vec::with_capacity(sniffer.max_depth());
    File::open(file)?
        .take(sniffer.max_depth() as u64)
        .read_to_end(&mut magic)?;

    println!("File: {}", file.display());
    println!("Magic bytes: {:02X?}", magic);
    match sniffer.find_mime_type(&magic) {
        Some(mime) => println!("MIME type: {mime}"),
        None => println!("MIME type: unknown"),
    }

    let format = ArchiveFormat::from_magic(&magic);
    let support = if format.is_supported() {
        "supported"
    } else {
        "recognised, not supported"
    };
    println!("Archive reader: {format} (.{}, {support})", format.extension());
    Ok(())
}
