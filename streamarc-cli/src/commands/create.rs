//! Create command implementation.

use crate::utils::human_size;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use streamarc_archive::{CompressOptions, FileInfo, ZipperHandle};

/// Collect regular files under `path`, naming them relative to `base`.
fn collect_files(
    path: &Path,
    base: &Path,
    out: &mut Vec<FileInfo>,
) -> Result<(), Box<dyn std::error::Error>> {
    let metadata = fs::metadata(path)?;
    if metadata.is_dir() {
        let mut children: Vec<PathBuf> = fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<_, _>>()?;
        children.sort();
        for child in children {
            collect_files(&child, base, out)?;
        }
        return Ok(());
    }

    let relative = path.strip_prefix(base).unwrap_or(path);
    let name = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    let modified = metadata.modified().unwrap_or_else(|_| SystemTime::now());
    out.push(FileInfo::new(name, fs::read(path)?, modified));
    Ok(())
}

pub fn cmd_create(
    archive: &Path,
    inputs: &[PathBuf],
    batch_size: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    for input in inputs {
        let base = input.parent().unwrap_or(Path::new(""));
        collect_files(input, base, &mut files)?;
    }
    let count = files.len();
    log::debug!("adding {count} file(s) in batches of {batch_size}");

    let mut batches: Vec<Vec<FileInfo>> = Vec::new();
    let mut files = files.into_iter().peekable();
    while files.peek().is_some() {
        batches.push(files.by_ref().take(batch_size).collect());
    }
    if batches.is_empty() {
        batches.push(Vec::new());
    }

    let mut zipper = ZipperHandle::new(CompressOptions::default());
    let last = batches.len() - 1;
    for (i, batch) in batches.into_iter().enumerate() {
        if i == 0 {
            zipper.start(batch, i == last)?;
        } else {
            zipper.append_files(batch, i == last)?;
        }
    }
    let bytes = zipper.wait()?;
    fs::write(archive, &bytes)?;

    println!(
        "Created {} with {} file(s), {}",
        archive.display(),
        count,
        human_size(bytes.len() as u64)
    );
    Ok(())
}
