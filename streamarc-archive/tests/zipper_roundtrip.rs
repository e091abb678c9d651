use std::time::{Duration, SystemTime, UNIX_EPOCH};
use streamarc_archive::zip::signatures::{END_OF_CENTRAL_DIR_SIG, LOCAL_FILE_HEADER_SIG};
use streamarc_archive::{
    CompressEvent, CompressOptions, CompressorState, FileInfo, UnarchiveEvent, UnarchiveOptions,
    UnarchiveState, ZipWriter, get_unarchiver,
};

fn modified() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}

/// Run batches through a writer, concatenating the `compress` payloads.
fn compress(batches: Vec<(Vec<FileInfo>, bool)>) -> (Vec<u8>, Vec<CompressEvent>) {
    let mut writer = ZipWriter::new(CompressOptions::default());
    let mut archive = Vec::new();
    let mut events = Vec::new();
    for (files, is_last) in batches {
        writer
            .append_files(files, is_last, |event| {
                if let CompressEvent::Compress { bytes } = &event {
                    archive.extend_from_slice(bytes);
                }
                events.push(event);
            })
            .unwrap();
    }
    assert_eq!(writer.bytes_written(), archive.len() as u64);
    (archive, events)
}

fn extract(archive: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut unarchiver = get_unarchiver(archive, UnarchiveOptions::default())
        .unwrap()
        .unwrap();
    let mut files = Vec::new();
    let state = unarchiver
        .update(archive.to_vec(), |event| {
            if let UnarchiveEvent::Extract(file) = event {
                files.push((file.filename, file.file_data));
            }
        })
        .unwrap();
    assert_eq!(state, UnarchiveState::Finished);
    files
}

#[test]
fn test_hello_world_archive() {
    let files = vec![FileInfo::new("hello.txt", b"hello world".to_vec(), modified())];
    let (archive, events) = compress(vec![(files, true)]);

    assert_eq!(archive[..4], LOCAL_FILE_HEADER_SIG.to_le_bytes());
    // crc-32 field of the local header
    assert_eq!(archive[14..18], 0x0D4A1185u32.to_le_bytes());
    assert_eq!(&archive[30..39], b"hello.txt");
    assert_eq!(&archive[39..50], b"hello world");

    let eocd = archive.len() - 22;
    assert_eq!(archive[eocd..eocd + 4], END_OF_CENTRAL_DIR_SIG.to_le_bytes());
    // central directory offset points just past the single local record
    assert_eq!(archive[eocd + 16..eocd + 20], 50u32.to_le_bytes());

    assert!(matches!(events.first(), Some(CompressEvent::Start)));
    assert!(matches!(events.last(), Some(CompressEvent::Finish)));

    assert_eq!(
        extract(&archive),
        [("hello.txt".to_string(), b"hello world".to_vec())]
    );
}

#[test]
fn test_store_is_lossless() {
    let payloads: Vec<Vec<u8>> = vec![
        (0..=255u8).collect(),
        b"PK\x03\x04 looks like a header".to_vec(),
        vec![0xAA; 70_000],
        b"x".to_vec(),
    ];
    let files = payloads
        .iter()
        .enumerate()
        .map(|(i, data)| FileInfo::new(format!("file-{i}.bin"), data.clone(), modified()))
        .collect();
    let (archive, _) = compress(vec![(files, true)]);

    let extracted = extract(&archive);
    assert_eq!(extracted.len(), payloads.len());
    for ((name, data), (i, expected)) in extracted.iter().zip(payloads.iter().enumerate()) {
        assert_eq!(name, &format!("file-{i}.bin"));
        assert_eq!(data, expected);
    }
}

#[test]
fn test_batches_extract_in_order() {
    let first = vec![FileInfo::new("one.txt", b"1".to_vec(), modified())];
    let second = vec![
        FileInfo::new("two.txt", b"22".to_vec(), modified()),
        FileInfo::new("three.txt", b"333".to_vec(), modified()),
    ];
    let (archive, events) = compress(vec![(first, false), (Vec::new(), false), (second, true)]);

    let starts = events
        .iter()
        .filter(|e| matches!(e, CompressEvent::Start))
        .count();
    assert_eq!(starts, 1);

    let names: Vec<String> = extract(&archive).into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, ["one.txt", "two.txt", "three.txt"]);
}

#[test]
fn test_non_ascii_name_round_trips() {
    let files = vec![FileInfo::new("résumé.txt", b"cv".to_vec(), modified())];
    let (archive, _) = compress(vec![(files, true)]);
    let extracted = extract(&archive);
    assert_eq!(extracted[0].0, "résumé.txt");
}

#[test]
fn test_writer_state_after_last_batch() {
    let mut writer = ZipWriter::new(CompressOptions::default());
    let state = writer.append_files(Vec::new(), false, |_| {}).unwrap();
    assert_eq!(state, CompressorState::Waiting);
    let state = writer.append_files(Vec::new(), true, |_| {}).unwrap();
    assert_eq!(state, CompressorState::Finished);
    assert!(writer.append_files(Vec::new(), true, |_| {}).is_err());
}
