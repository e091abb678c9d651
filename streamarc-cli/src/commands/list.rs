//! List command implementation.

use super::{StreamOptions, stream_archive};
use crate::utils::{human_size, matches_filters};
use serde::Serialize;
use std::path::Path;
use streamarc_archive::UnarchiveEvent;

/// One listed entry.
#[derive(Debug, Serialize)]
struct EntryJson {
    name: String,
    size: u64,
    compressed_size: u64,
    ratio: f64,
}

/// JSON output for an archive listing.
#[derive(Debug, Serialize)]
struct ArchiveListJson {
    archive: String,
    entries: Vec<EntryJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
}

/// Options for listing archive contents.
pub struct ListOptions<'a> {
    pub long: bool,
    pub json: bool,
    pub include: &'a [String],
    pub exclude: &'a [String],
    pub stream: StreamOptions,
}

fn space_savings(size: u64, compressed_size: u64) -> f64 {
    if size == 0 {
        return 0.0;
    }
    (1.0 - compressed_size as f64 / size as f64) * 100.0
}

pub fn cmd_list(archive: &Path, options: &ListOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut entries = Vec::new();
    let mut comment = None;

    stream_archive(archive, options.stream, |event| match event {
        UnarchiveEvent::Extract(file) => {
            if matches_filters(&file.filename, options.include, options.exclude) {
                let size = file.file_data.len() as u64;
                entries.push(EntryJson {
                    ratio: space_savings(size, file.compressed_size),
                    name: file.filename,
                    size,
                    compressed_size: file.compressed_size,
                });
            }
        }
        UnarchiveEvent::Finish { metadata } => comment = metadata.comment,
        UnarchiveEvent::Info { message } => eprintln!("{message}"),
        _ => {}
    })?;

    if options.json {
        let listing = ArchiveListJson {
            archive: archive.display().to_string(),
            entries,
            comment: comment.filter(|c| !c.is_empty()),
        };
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    if !options.long {
        for entry in &entries {
            println!("{}", entry.name);
        }
        return Ok(());
    }

    println!("Archive: {}", archive.display());
    println!("{:>10} {:>10} {:>6}  Name", "Size", "Compressed", "Ratio");
    println!("{}", "-".repeat(50));
    let mut total_size = 0u64;
    let mut total_compressed = 0u64;
    for entry in &entries {
        println!(
            "{:>10} {:>10} {:>5.1}%  {}",
            entry.size, entry.compressed_size, entry.ratio, entry.name
        );
        total_size += entry.size;
        total_compressed += entry.compressed_size;
    }
    println!("{}", "-".repeat(50));
    println!(
        "{:>10} {:>10} {:>5.1}%  {} files ({})",
        total_size,
        total_compressed,
        space_savings(total_size, total_compressed),
        entries.len(),
        human_size(total_size)
    );
    if let Some(comment) = comment.filter(|c| !c.is_empty()) {
        println!("Comment: {comment}");
    }
    Ok(())
}
