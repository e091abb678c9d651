//! Thread-isolated unarchiver and zipper handles.
//!
//! Each handle owns a dedicated worker thread. Chunks and file batches are
//! moved to the worker through an unbounded command channel; events come
//! back through a second channel in the order they were produced. The
//! worker owns the only event sender, so the event stream ends (`None`)
//! once the worker has emitted `finish` or `error`, or has been stopped.
//!
//! Events can be consumed from plain threads with the `*_blocking`
//! methods or from async code with the `async` ones. The blocking methods
//! must not be called from inside a tokio runtime.

use crate::event::{CompressEvent, UnarchiveEvent};
use crate::options::{CompressOptions, UnarchiveOptions};
use crate::unarchiver::{Unarchiver, UnarchiveState, get_unarchiver};
use crate::zip::{CompressorState, FileInfo, ZipWriter};
use std::thread;
use streamarc_core::error::{Result, StreamArcError};
use tokio::sync::mpsc;

/// Commands accepted by the unarchive worker.
enum UnarchiveCommand {
    /// More archive bytes.
    Chunk { data: Vec<u8> },
}

/// Commands accepted by the compress worker.
enum CompressCommand {
    /// Another batch of files.
    Append { files: Vec<FileInfo>, is_last: bool },
}

/// Spawn a detached, named worker thread.
fn spawn_worker<F>(name: &str, body: F) -> Result<()>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(body)?;
    Ok(())
}

/// Feed one chunk to the unarchiver, forwarding its events. Returns
/// `false` once the worker should exit.
fn feed_chunk(
    unarchiver: &mut Unarchiver,
    data: Vec<u8>,
    events: &mpsc::UnboundedSender<UnarchiveEvent>,
) -> bool {
    let result = unarchiver.update(data, |event| {
        // A closed receiver means the handle was stopped or dropped.
        let _ = events.send(event);
    });
    match result {
        Ok(state) if state.is_terminal() => false,
        Ok(_) => !events.is_closed(),
        Err(err) => {
            log::error!("unarchive worker failed: {err}");
            let _ = events.send(UnarchiveEvent::Error {
                message: err.to_string(),
            });
            false
        }
    }
}

fn run_unarchiver(
    mut unarchiver: Unarchiver,
    initial: Vec<u8>,
    mut commands: mpsc::UnboundedReceiver<UnarchiveCommand>,
    events: mpsc::UnboundedSender<UnarchiveEvent>,
) {
    let mut running = feed_chunk(&mut unarchiver, initial, &events);
    while running {
        let Some(command) = commands.blocking_recv() else {
            break;
        };
        match command {
            UnarchiveCommand::Chunk { data } => {
                let _ = events.send(UnarchiveEvent::Append {
                    num_bytes: data.len(),
                });
                running = feed_chunk(&mut unarchiver, data, &events);
            }
        }
    }
    log::debug!(
        "unarchive worker exiting in state {:?}",
        unarchiver.state()
    );
    // Commands close before events: once the event stream ends, further
    // updates must fail.
    drop(commands);
    drop(events);
}

/// Coordinating side of a worker-hosted [`Unarchiver`].
///
/// ```no_run
/// use streamarc_archive::{UnarchiveOptions, UnarchiverHandle};
///
/// let bytes = std::fs::read("comic.cbz").unwrap();
/// let (head, tail) = bytes.split_at(bytes.len() / 2);
/// let mut handle = UnarchiverHandle::open(head.to_vec(), UnarchiveOptions::default())
///     .unwrap()
///     .expect("enough bytes to sniff");
/// handle.start().unwrap();
/// handle.update(tail.to_vec()).unwrap();
/// while let Some(event) = handle.next_event_blocking() {
///     println!("{}", event.kind());
/// }
/// ```
pub struct UnarchiverHandle {
    mime_type: &'static str,
    pending: Option<(Unarchiver, Vec<u8>)>,
    commands: Option<mpsc::UnboundedSender<UnarchiveCommand>>,
    events: Option<mpsc::UnboundedReceiver<UnarchiveEvent>>,
}

impl std::fmt::Debug for UnarchiverHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnarchiverHandle")
            .field("mime_type", &self.mime_type)
            .field("started", &self.is_started())
            .finish()
    }
}

impl UnarchiverHandle {
    /// Wrap an unarchiver and the bytes it will start from.
    pub fn new(unarchiver: Unarchiver, initial: Vec<u8>) -> Self {
        Self {
            mime_type: unarchiver.mime_type(),
            pending: Some((unarchiver, initial)),
            commands: None,
            events: None,
        }
    }

    /// Sniff `initial` and build a handle for the matching format.
    ///
    /// `Ok(None)` when `initial` is too short to sniff.
    pub fn open(initial: Vec<u8>, options: UnarchiveOptions) -> Result<Option<Self>> {
        Ok(get_unarchiver(&initial, options)?.map(|unarchiver| Self::new(unarchiver, initial)))
    }

    /// MIME type of the archive being read.
    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    /// Whether [`start`](Self::start) has been called.
    pub fn is_started(&self) -> bool {
        self.pending.is_none()
    }

    /// Spawn the worker and hand it the initial bytes.
    pub fn start(&mut self) -> Result<()> {
        let Some((unarchiver, initial)) = self.pending.take() else {
            return Err(StreamArcError::protocol_misuse("unarchiver already started"));
        };
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        spawn_worker("streamarc-unarchiver", move || {
            run_unarchiver(unarchiver, initial, command_rx, event_tx)
        })?;
        self.commands = Some(command_tx);
        self.events = Some(event_rx);
        Ok(())
    }

    /// Hand another chunk to the worker. Ownership of `chunk` moves to
    /// the worker thread.
    pub fn update(&mut self, chunk: Vec<u8>) -> Result<()> {
        let Some(commands) = &self.commands else {
            return Err(StreamArcError::protocol_misuse(
                "update called before the unarchiver was started",
            ));
        };
        commands
            .send(UnarchiveCommand::Chunk { data: chunk })
            .map_err(|_| StreamArcError::WorkerDisconnected)
    }

    /// Terminate the worker. Events not yet received are discarded and the
    /// worker exits at its next channel operation.
    pub fn stop(&mut self) {
        self.commands = None;
        if let Some(mut events) = self.events.take() {
            events.close();
        }
    }

    /// Next event, blocking the current thread. `None` once the event
    /// stream has ended or before the worker was started.
    pub fn next_event_blocking(&mut self) -> Option<UnarchiveEvent> {
        self.events.as_mut()?.blocking_recv()
    }

    /// Next event, awaiting it.
    pub async fn next_event(&mut self) -> Option<UnarchiveEvent> {
        self.events.as_mut()?.recv().await
    }
}

fn run_zipper(
    options: CompressOptions,
    mut commands: mpsc::UnboundedReceiver<CompressCommand>,
    events: mpsc::UnboundedSender<CompressEvent>,
) {
    let mut writer = ZipWriter::new(options);
    while let Some(command) = commands.blocking_recv() {
        match command {
            CompressCommand::Append { files, is_last } => {
                let result = writer.append_files(files, is_last, |event| {
                    let _ = events.send(event);
                });
                match result {
                    Ok(CompressorState::Finished) => break,
                    Ok(_) => {}
                    Err(err) => {
                        log::error!("compress worker failed: {err}");
                        let _ = events.send(CompressEvent::Error {
                            message: err.to_string(),
                        });
                        break;
                    }
                }
            }
        }
    }
}

/// Client-side status of a [`ZipperHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressStatus {
    /// Not started.
    NotStarted,
    /// Worker spawned, no event seen yet.
    Ready,
    /// `start` received.
    Working,
    /// `finish` received; the archive is complete.
    Complete,
    /// `error` received.
    Error,
}

/// Coordinating side of a worker-hosted [`ZipWriter`].
///
/// Status follows the events as they are received, and every `compress`
/// payload is appended to the handle's archive buffer.
pub struct ZipperHandle {
    options: CompressOptions,
    status: CompressStatus,
    commands: Option<mpsc::UnboundedSender<CompressCommand>>,
    events: Option<mpsc::UnboundedReceiver<CompressEvent>>,
    archive: Vec<u8>,
    error: Option<String>,
}

impl std::fmt::Debug for ZipperHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipperHandle")
            .field("status", &self.status)
            .field("archive_len", &self.archive.len())
            .finish()
    }
}

impl ZipperHandle {
    /// Create an idle handle.
    pub fn new(options: CompressOptions) -> Self {
        Self {
            options,
            status: CompressStatus::NotStarted,
            commands: None,
            events: None,
            archive: Vec::new(),
            error: None,
        }
    }

    /// Current status.
    pub fn status(&self) -> CompressStatus {
        self.status
    }

    /// Archive bytes received so far.
    pub fn archive(&self) -> &[u8] {
        &self.archive
    }

    /// Spawn the worker and send the first batch.
    pub fn start(&mut self, files: Vec<FileInfo>, is_last: bool) -> Result<()> {
        if self.status != CompressStatus::NotStarted {
            return Err(StreamArcError::protocol_misuse("zipper already started"));
        }
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let options = self.options;
        spawn_worker("streamarc-zipper", move || {
            run_zipper(options, command_rx, event_tx)
        })?;
        self.commands = Some(command_tx);
        self.events = Some(event_rx);
        self.status = CompressStatus::Ready;
        self.append_files(files, is_last)
    }

    /// Send another batch of files.
    pub fn append_files(&mut self, files: Vec<FileInfo>, is_last: bool) -> Result<()> {
        let Some(commands) = &self.commands else {
            return Err(StreamArcError::protocol_misuse(
                "append_files called before the zipper was started",
            ));
        };
        if !matches!(self.status, CompressStatus::Ready | CompressStatus::Working) {
            return Err(StreamArcError::protocol_misuse(format!(
                "append_files called while the zipper is {:?}",
                self.status
            )));
        }
        commands
            .send(CompressCommand::Append { files, is_last })
            .map_err(|_| StreamArcError::WorkerDisconnected)
    }

    fn observe(&mut self, event: &CompressEvent) {
        match event {
            CompressEvent::Start => self.status = CompressStatus::Working,
            CompressEvent::Compress { bytes } => self.archive.extend_from_slice(bytes),
            CompressEvent::Finish => {
                self.status = CompressStatus::Complete;
                self.commands = None;
            }
            CompressEvent::Error { message } => {
                self.status = CompressStatus::Error;
                self.error = Some(message.clone());
                self.commands = None;
            }
        }
    }

    /// Next event, blocking the current thread.
    pub fn next_event_blocking(&mut self) -> Option<CompressEvent> {
        let event = self.events.as_mut()?.blocking_recv()?;
        self.observe(&event);
        Some(event)
    }

    /// Next event, awaiting it.
    pub async fn next_event(&mut self) -> Option<CompressEvent> {
        let event = self.events.as_mut()?.recv().await?;
        self.observe(&event);
        Some(event)
    }

    /// Drain the remaining events and return the finished archive.
    ///
    /// The last batch must already have been sent with `is_last` set,
    /// otherwise this blocks until one is.
    pub fn wait(mut self) -> Result<Vec<u8>> {
        while self.next_event_blocking().is_some() {}
        match self.status {
            CompressStatus::Complete => Ok(self.archive),
            CompressStatus::Error => Err(StreamArcError::worker_failed(
                self.error.unwrap_or_default(),
            )),
            CompressStatus::NotStarted => Err(StreamArcError::protocol_misuse(
                "wait called before the zipper was started",
            )),
            CompressStatus::Ready | CompressStatus::Working => {
                Err(StreamArcError::WorkerDisconnected)
            }
        }
    }
}
