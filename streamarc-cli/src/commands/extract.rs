//! Extract command implementation.

use super::{StreamOptions, stream_archive};
use crate::utils::{create_progress_bar, human_size, matches_filters, sanitize_entry_path};
use std::fs;
use std::io::Write;
use std::path::Path;
use streamarc_archive::UnarchiveEvent;

/// Options for extracting an archive.
pub struct ExtractOptions<'a> {
    pub output: &'a Path,
    pub include: &'a [String],
    pub exclude: &'a [String],
    pub json: bool,
    pub progress: bool,
    pub stream: StreamOptions,
}

pub fn cmd_extract(
    archive: &Path,
    options: &ExtractOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    if options.json {
        return extract_json(archive, options);
    }

    let archive_len = fs::metadata(archive)?.len();
    let pb = create_progress_bar(archive_len, options.progress);
    let mut written = 0usize;
    let mut written_bytes = 0u64;
    let mut failure: Option<std::io::Error> = None;

    stream_archive(archive, options.stream, |event| match event {
        UnarchiveEvent::Extract(file) => {
            if failure.is_some()
                || !matches_filters(&file.filename, options.include, options.exclude)
            {
                return;
            }
            let Some(relative) = sanitize_entry_path(&file.filename) else {
                log::warn!("skipping entry with unusable name {:?}", file.filename);
                return;
            };
            let path = options.output.join(relative);
            let result = path
                .parent()
                .map_or(Ok(()), fs::create_dir_all)
                .and_then(|()| fs::write(&path, &file.file_data));
            match result {
                Ok(()) => {
                    written += 1;
                    written_bytes += file.file_data.len() as u64;
                    pb.println(format!("  {}", path.display()));
                }
                Err(err) => failure = Some(err),
            }
        }
        UnarchiveEvent::Progress(progress) => {
            pb.set_position(progress.total_compressed_bytes_read);
            pb.set_message(progress.current_filename);
        }
        UnarchiveEvent::Info { message } => pb.println(message),
        _ => {}
    })?;
    pb.finish_and_clear();

    if let Some(err) = failure {
        return Err(err.into());
    }
    println!(
        "Extracted {} file(s), {} to {}",
        written,
        human_size(written_bytes),
        options.output.display()
    );
    Ok(())
}

/// Print every event as one JSON object per line.
fn extract_json(archive: &Path, options: &ExtractOptions) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut failure: Option<Box<dyn std::error::Error>> = None;

    stream_archive(archive, options.stream, |event| {
        if failure.is_some() {
            return;
        }
        if let UnarchiveEvent::Extract(file) = &event {
            if !matches_filters(&file.filename, options.include, options.exclude) {
                return;
            }
        }
        let line: Result<(), Box<dyn std::error::Error>> = serde_json::to_string(&event)
            .map_err(Into::into)
            .and_then(|json| writeln!(out, "{json}").map_err(Into::into));
        if let Err(err) = line {
            failure = Some(err);
        }
    })?;

    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
