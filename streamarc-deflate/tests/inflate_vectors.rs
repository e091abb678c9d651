//! Inflate against raw DEFLATE streams produced by zlib.

use streamarc_core::crc::Crc32;
use streamarc_core::error::StreamArcError;
use streamarc_deflate::{BlockInfo, BlockType, Inflater, inflate};

const WORDS: &[u8] = include_bytes!("data/words.txt");
const WORDS_DYNAMIC: &[u8] = include_bytes!("data/words.dynamic.deflate");
const WORDS_FIXED: &[u8] = include_bytes!("data/words.fixed.deflate");
const WORDS_STORED: &[u8] = include_bytes!("data/words.stored.deflate");
const WORDS_FLUSHED: &[u8] = include_bytes!("data/words.flushed.deflate");

fn inflate_blocks(data: &[u8]) -> (Vec<u8>, Vec<BlockInfo>) {
    let mut blocks = Vec::new();
    let out = Inflater::with_size_hint(data, WORDS.len())
        .inflate_with(|info| blocks.push(*info))
        .unwrap();
    (out, blocks)
}

#[test]
fn test_run_of_258_bytes() {
    let compressed = [0x4b, 0x4c, 0x1c, 0xe9, 0x00, 0x00];
    let out = inflate(&compressed).unwrap();
    assert_eq!(out.len(), 258);
    assert!(out.iter().all(|&b| b == b'a'));
}

#[test]
fn test_short_fixed_stream() {
    let compressed = [
        0xcb, 0x48, 0xcd, 0xc9, 0xc9, 0x57, 0xc8, 0xc0, 0x20, 0xcb, 0xf3, 0x8b, 0x72, 0x52, 0x74,
        0xa0, 0x9c, 0x94, 0xd4, 0xb4, 0x9c, 0xc4, 0x92, 0x54, 0xc5, 0x0c, 0x9a, 0x29, 0x06, 0x00,
    ];
    let out = inflate(&compressed).unwrap();
    assert_eq!(out, b"hello hello hello hello world, hello deflate!".repeat(3));
}

#[test]
fn test_dynamic_blocks() {
    let (out, blocks) = inflate_blocks(WORDS_DYNAMIC);
    assert_eq!(out.len(), WORDS.len());
    assert_eq!(Crc32::compute(&out), Crc32::compute(WORDS));
    assert!(blocks.iter().any(|b| b.block_type == BlockType::Dynamic));
    assert!(blocks.last().unwrap().is_final);
    assert_eq!(blocks.last().unwrap().total_bytes, WORDS.len());
}

#[test]
fn test_fixed_blocks() {
    let (out, blocks) = inflate_blocks(WORDS_FIXED);
    assert_eq!(out, WORDS);
    assert!(blocks.iter().all(|b| b.block_type == BlockType::Fixed));
}

#[test]
fn test_stored_blocks() {
    let (out, blocks) = inflate_blocks(WORDS_STORED);
    assert_eq!(out, WORDS);
    // A stored block holds at most 65535 bytes.
    assert!(blocks.len() >= 2);
    assert!(blocks.iter().all(|b| b.block_type == BlockType::Stored));
    assert!(blocks.iter().all(|b| b.block_bytes <= 65535));
    let sum: usize = blocks.iter().map(|b| b.block_bytes).sum();
    assert_eq!(sum, WORDS.len());
}

#[test]
fn test_full_flush_marker() {
    let (out, blocks) = inflate_blocks(WORDS_FLUSHED);
    assert_eq!(out, WORDS);
    // The flush point is an empty, non-final stored block.
    assert!(
        blocks
            .iter()
            .any(|b| b.block_type == BlockType::Stored && b.block_bytes == 0 && !b.is_final)
    );
}

#[test]
fn test_truncated_dynamic_stream() {
    let truncated = &WORDS_DYNAMIC[..WORDS_DYNAMIC.len() / 2];
    let err = inflate(truncated).unwrap_err();
    assert!(matches!(err, StreamArcError::UnexpectedEof { .. }));
}

#[test]
fn test_every_prefix_of_short_stream_fails_cleanly() {
    let compressed = [0x4b, 0x4c, 0x1c, 0xe9, 0x00, 0x00];
    for len in 0..compressed.len() {
        assert!(inflate(&compressed[..len]).is_err(), "prefix {len}");
    }
}
