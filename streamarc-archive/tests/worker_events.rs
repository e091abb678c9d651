use std::time::{Duration, UNIX_EPOCH};
use streamarc_archive::{
    CompressOptions, CompressStatus, FileInfo, UnarchiveEvent, UnarchiveOptions,
    UnarchiverHandle, ZipperHandle,
};

const DESCRIPTOR: &[u8] = include_bytes!("data/descriptor.zip");
const LINES: &[u8] = include_bytes!("data/lines.txt");

fn open_handle(bytes: &[u8], split: usize) -> UnarchiverHandle {
    let mut handle = UnarchiverHandle::open(bytes[..split].to_vec(), UnarchiveOptions::default())
        .unwrap()
        .unwrap();
    handle.start().unwrap();
    for chunk in bytes[split..].chunks(128) {
        handle.update(chunk.to_vec()).unwrap();
    }
    handle
}

/// Checks the ordering contract over a complete event sequence.
fn assert_ordered(events: &[UnarchiveEvent]) {
    assert!(matches!(events.first(), Some(UnarchiveEvent::Start)));
    assert!(matches!(events.last(), Some(UnarchiveEvent::Finish { .. })));
    let terminals = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(terminals, 1);
    let starts = events
        .iter()
        .filter(|e| matches!(e, UnarchiveEvent::Start))
        .count();
    assert_eq!(starts, 1);
}

#[test]
fn test_worker_streams_descriptor_archive() {
    let mut handle = open_handle(DESCRIPTOR, 16);
    let mut events = Vec::new();
    while let Some(event) = handle.next_event_blocking() {
        events.push(event);
    }
    assert_ordered(&events);

    let appended: usize = events
        .iter()
        .filter_map(|e| match e {
            UnarchiveEvent::Append { num_bytes } => Some(*num_bytes),
            _ => None,
        })
        .sum();
    assert!(appended > 0);
    assert!(appended <= DESCRIPTOR.len() - 16);

    let files: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            UnarchiveEvent::Extract(file) => Some(file),
            _ => None,
        })
        .collect();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].file_data, LINES);

    // progress counters never go backwards
    let totals: Vec<u64> = events
        .iter()
        .filter_map(|e| match e {
            UnarchiveEvent::Progress(p) => Some(p.bytes_unarchived),
            _ => None,
        })
        .collect();
    assert!(totals.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_zipper_then_unarchiver() {
    let modified = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    let mut zipper = ZipperHandle::new(CompressOptions::default());
    zipper
        .start(vec![FileInfo::new("lines.txt", LINES.to_vec(), modified)], false)
        .unwrap();
    zipper
        .append_files(vec![FileInfo::new("hello.txt", b"hello world".to_vec(), modified)], true)
        .unwrap();
    let archive = zipper.wait().unwrap();

    let mut handle = open_handle(&archive, 64);
    let mut names = Vec::new();
    while let Some(event) = handle.next_event_blocking() {
        if let UnarchiveEvent::Extract(file) = event {
            names.push(file.filename);
        }
    }
    assert_eq!(names, ["lines.txt", "hello.txt"]);
}

#[tokio::test]
async fn test_events_consumed_async() {
    let mut handle = open_handle(DESCRIPTOR, 100);
    let mut events = Vec::new();
    while let Some(event) = handle.next_event().await {
        events.push(event);
    }
    assert_ordered(&events);

    let modified = UNIX_EPOCH + Duration::from_secs(1_600_000_000);
    let mut zipper = ZipperHandle::new(CompressOptions::default());
    zipper
        .start(vec![FileInfo::new("a", b"a".to_vec(), modified)], true)
        .unwrap();
    while zipper.next_event().await.is_some() {}
    assert_eq!(zipper.status(), CompressStatus::Complete);
    assert!(zipper.archive().starts_with(b"PK\x03\x04"));
}
