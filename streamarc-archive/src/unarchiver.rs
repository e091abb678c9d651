//! Streaming unarchive driver.
//!
//! An [`Unarchiver`] owns the committed [`ByteStream`] for one archive and
//! a format-specific [`ArchiveReader`]. Each call to
//! [`Unarchiver::update`] appends a chunk and then asks the reader for
//! entries one at a time on a forked cursor. A step that completes is
//! committed by adopting the fork; a step that runs out of bytes is
//! dropped, the driver moves to [`UnarchiveState::Waiting`], and the same
//! step is retried from the committed position when more bytes arrive.
//! Any other parse error leaves the driver in [`UnarchiveState::Failed`].
//!
//! ```text
//! NotStarted ──▶ Unarchiving ◀──▶ Waiting
//!                  │      │
//!                  ▼      ▼
//!             Finished  Failed
//! ```

use crate::detect::ArchiveFormat;
use crate::event::{ArchiveMetadata, ExtractedFile, ProgressInfo, UnarchiveEvent};
use crate::options::UnarchiveOptions;
use crate::tar::Untarrer;
use crate::zip::Unzipper;
use std::sync::Arc;
use streamarc_core::bytestream::ByteStream;
use streamarc_core::error::{Result, StreamArcError};

/// Smallest first chunk the factory will sniff.
pub const MIN_SNIFF_LEN: usize = 10;

/// Lifecycle of an unarchiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnarchiveState {
    /// No bytes received yet.
    NotStarted,
    /// Parsing entries.
    Unarchiving,
    /// Parked until more bytes are appended.
    Waiting,
    /// The archive trailer was read. Terminal.
    Finished,
    /// A parse error other than running out of bytes was returned. Terminal.
    Failed,
}

impl UnarchiveState {
    /// Whether no further chunks are accepted.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }
}

/// Outcome of one parse step.
#[derive(Debug)]
pub enum ParseStep {
    /// An entry was extracted.
    Entry(ExtractedFile),
    /// A record was consumed that yields no file (a directory, a name
    /// extension record).
    Skipped,
    /// Not enough bytes yet; nothing was consumed.
    Pending,
    /// The archive is complete.
    Done(ArchiveMetadata),
}

/// What a reader can touch while parsing: options, progress counters and
/// the event sink.
pub struct UnarchiveContext<'a> {
    options: &'a UnarchiveOptions,
    progress: &'a mut ProgressInfo,
    sink: &'a mut dyn FnMut(UnarchiveEvent),
}

impl<'a> UnarchiveContext<'a> {
    /// Bundle the parts of a parse step.
    pub fn new(
        options: &'a UnarchiveOptions,
        progress: &'a mut ProgressInfo,
        sink: &'a mut dyn FnMut(UnarchiveEvent),
    ) -> Self {
        Self {
            options,
            progress,
            sink,
        }
    }

    /// Reader options.
    pub fn options(&self) -> &UnarchiveOptions {
        self.options
    }

    /// Current progress counters.
    pub fn progress(&self) -> &ProgressInfo {
        self.progress
    }

    /// Mutable progress counters.
    pub fn progress_mut(&mut self) -> &mut ProgressInfo {
        self.progress
    }

    /// Send an event.
    pub fn emit(&mut self, event: UnarchiveEvent) {
        (self.sink)(event);
    }

    /// Send a snapshot of the progress counters.
    pub fn post_progress(&mut self) {
        let snapshot = self.progress.clone();
        (self.sink)(UnarchiveEvent::Progress(snapshot));
    }

    /// Log a diagnostic and, in debug mode, send it as an `info` event.
    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::debug!("{message}");
        if self.options.debug {
            (self.sink)(UnarchiveEvent::Info { message });
        }
    }

    /// [`info`](Self::info) for each line.
    pub fn info_lines(&mut self, lines: Vec<String>) {
        if !self.options.debug && !log::log_enabled!(log::Level::Debug) {
            return;
        }
        for line in lines {
            self.info(line);
        }
    }
}

/// A format-specific entry parser driven by [`Unarchiver`].
pub trait ArchiveReader: Send {
    /// MIME type of the format.
    fn mime_type(&self) -> &'static str;

    /// Parse the next record from `stream`.
    ///
    /// `stream` is a fork of the committed stream; the driver adopts it
    /// unless the step is [`ParseStep::Pending`]. An
    /// [`StreamArcError::Overflow`] error is treated exactly like
    /// `Pending`. Progress counters must only be advanced once every byte
    /// of the record has been read, so a retried step never counts twice.
    fn parse_next_entry(
        &mut self,
        stream: &mut ByteStream,
        ctx: &mut UnarchiveContext<'_>,
    ) -> Result<ParseStep>;
}

/// Drives an [`ArchiveReader`] over incrementally appended bytes.
pub struct Unarchiver {
    reader: Box<dyn ArchiveReader>,
    stream: ByteStream,
    state: UnarchiveState,
    progress: ProgressInfo,
    options: UnarchiveOptions,
}

impl std::fmt::Debug for Unarchiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unarchiver")
            .field("mime_type", &self.reader.mime_type())
            .field("state", &self.state)
            .field("progress", &self.progress)
            .finish()
    }
}

impl Unarchiver {
    /// Wrap a reader.
    pub fn new(reader: Box<dyn ArchiveReader>, options: UnarchiveOptions) -> Self {
        Self {
            reader,
            stream: ByteStream::default(),
            state: UnarchiveState::NotStarted,
            progress: ProgressInfo::default(),
            options,
        }
    }

    /// MIME type of the archive format.
    pub fn mime_type(&self) -> &'static str {
        self.reader.mime_type()
    }

    /// Current state.
    pub fn state(&self) -> UnarchiveState {
        self.state
    }

    /// Current progress counters.
    pub fn progress(&self) -> &ProgressInfo {
        &self.progress
    }

    /// Options in effect.
    pub fn options(&self) -> &UnarchiveOptions {
        &self.options
    }

    /// Append `chunk` and extract everything it makes available.
    ///
    /// Events go to `sink` in order. The first call emits `start`. Returns
    /// the state after the chunk is consumed: `Waiting` when more bytes are
    /// needed, `Finished` once `finish` has been emitted. A parse error is
    /// returned once and moves the unarchiver to `Failed`. Calling again
    /// after `Finished` or `Failed` fails with
    /// [`StreamArcError::ProtocolMisuse`].
    pub fn update<F>(&mut self, chunk: impl Into<Arc<[u8]>>, mut sink: F) -> Result<UnarchiveState>
    where
        F: FnMut(UnarchiveEvent),
    {
        match self.state {
            UnarchiveState::Finished => {
                return Err(StreamArcError::protocol_misuse(
                    "unarchiver received bytes after the archive finished",
                ));
            }
            UnarchiveState::Failed => {
                return Err(StreamArcError::protocol_misuse(
                    "unarchiver received bytes after a parse error",
                ));
            }
            _ => {}
        }

        self.stream.push(chunk);

        if self.state == UnarchiveState::NotStarted {
            self.progress = ProgressInfo::default();
            sink(UnarchiveEvent::Start);
            self.state = UnarchiveState::Unarchiving;
            self.progress.total_compressed_bytes_read = self.stream.bytes_read();
            sink(UnarchiveEvent::Progress(self.progress.clone()));
        } else {
            self.state = UnarchiveState::Unarchiving;
        }

        let mut ctx = UnarchiveContext::new(&self.options, &mut self.progress, &mut sink);
        loop {
            let mut cursor = self.stream.tee();
            let step = match self.reader.parse_next_entry(&mut cursor, &mut ctx) {
                Ok(step) => step,
                Err(err) if err.is_overflow() => ParseStep::Pending,
                Err(err) => {
                    log::debug!(
                        "parse failed after {} bytes consumed: {err}",
                        self.stream.bytes_read()
                    );
                    self.state = UnarchiveState::Failed;
                    return Err(err);
                }
            };

            match step {
                ParseStep::Entry(file) => {
                    self.stream = cursor;
                    ctx.progress_mut().total_compressed_bytes_read = self.stream.bytes_read();
                    ctx.emit(UnarchiveEvent::Extract(file));
                    ctx.post_progress();
                }
                ParseStep::Skipped => {
                    self.stream = cursor;
                }
                ParseStep::Pending => {
                    log::debug!(
                        "waiting for more bytes after {} consumed",
                        self.stream.bytes_read()
                    );
                    self.state = UnarchiveState::Waiting;
                    return Ok(self.state);
                }
                ParseStep::Done(metadata) => {
                    self.stream = cursor;
                    ctx.progress_mut().total_compressed_bytes_read = self.stream.bytes_read();
                    ctx.post_progress();
                    self.state = UnarchiveState::Finished;
                    ctx.emit(UnarchiveEvent::Finish { metadata });
                    return Ok(self.state);
                }
            }
        }
    }
}

/// Pick an unarchiver for an archive whose first chunk is `first_chunk`.
///
/// Returns `Ok(None)` when the chunk is too short to sniff. RAR archives
/// are recognised but not supported. Anything that is not ZIP or RAR is
/// handed to the TAR reader.
pub fn get_unarchiver(first_chunk: &[u8], options: UnarchiveOptions) -> Result<Option<Unarchiver>> {
    if first_chunk.len() < MIN_SNIFF_LEN {
        return Ok(None);
    }

    let format = ArchiveFormat::from_magic(first_chunk);
    log::debug!("selected {format} unarchiver");
    let reader: Box<dyn ArchiveReader> = match format {
        ArchiveFormat::Zip => Box::new(Unzipper::new()),
        ArchiveFormat::Tar => Box::new(Untarrer::new()),
        ArchiveFormat::Rar => return Err(StreamArcError::unsupported_format(format.to_string())),
    };
    Ok(Some(Unarchiver::new(reader, options)))
}
