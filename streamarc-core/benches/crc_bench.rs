//! CRC-32 throughput benchmarks.
//!
//! Covers the byte-at-a-time path (inputs under 16 bytes), the slicing-by-8
//! path, and incremental updates in the chunk sizes a streaming reader sees.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use streamarc_core::crc::Crc32;

mod test_data {
    /// Reproducible pseudo-random bytes.
    pub fn random(size: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(size);
        let mut seed: u64 = 0x123456789ABCDEF0;
        for _ in 0..size {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            data.push((seed >> 32) as u8);
        }
        data
    }

    pub fn text_like(size: usize) -> Vec<u8> {
        b"The quick brown fox jumps over the lazy dog. "
            .iter()
            .copied()
            .cycle()
            .take(size)
            .collect()
    }
}

fn bench_crc32_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc32_sizes");

    for (name, size) in [
        ("8B", 8),
        ("256B", 256),
        ("4KB", 4 * 1024),
        ("64KB", 64 * 1024),
        ("1MB", 1024 * 1024),
    ] {
        let data = test_data::random(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &data, |b, data| {
            b.iter(|| Crc32::compute(black_box(data)));
        });
    }

    group.finish();
}

fn bench_crc32_incremental(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc32_incremental");
    let data = test_data::text_like(1024 * 1024);
    group.throughput(Throughput::Bytes(data.len() as u64));

    for chunk in [512usize, 4096, 65536] {
        group.bench_with_input(BenchmarkId::new("chunk", chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let mut crc = Crc32::new();
                for piece in data.chunks(chunk) {
                    crc.update(black_box(piece));
                }
                crc.finalize()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_crc32_sizes, bench_crc32_incremental);
criterion_main!(benches);
