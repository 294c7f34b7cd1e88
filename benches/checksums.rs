//! Benchmarks for trailer checksums and frame encoding
//!
//! Covers the per-job costs on the encode path:
//! - CRC-8, CRC-16/XMODEM and CRC-32 over a full 384-dot page
//! - Splitting a bitmap into encoded data blocks

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use lxwire::codec::{BLOCK_SIZE_LINE, BLOCK_SIZE_SHORT, Bitmap, crc8, crc16_xmodem, crc32};
use std::hint::black_box;

/// 384 dots wide, 400 rows: one label's worth of raster data.
fn page() -> Vec<u8> {
    (0..48 * 400).map(|i| (i * 31 % 251) as u8).collect()
}

fn bench_checksums(c: &mut Criterion) {
    let data = page();

    let mut group = c.benchmark_group("checksums");
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("crc8_table", |b| b.iter(|| black_box(crc8(black_box(&data)))));
    group.bench_function("crc16_xmodem", |b| b.iter(|| black_box(crc16_xmodem(black_box(&data)))));
    group.bench_function("crc32", |b| b.iter(|| black_box(crc32(black_box(&data)))));

    group.finish();
}

fn bench_block_stream(c: &mut Criterion) {
    let bitmap = Bitmap::new(384, 400, page()).expect("Failed to build bitmap");

    let mut group = c.benchmark_group("block_stream");
    group.throughput(Throughput::Bytes(bitmap.as_bytes().len() as u64));

    for block_size in [BLOCK_SIZE_SHORT, BLOCK_SIZE_LINE] {
        group.bench_with_input(BenchmarkId::from_parameter(block_size), &block_size, |b, &size| {
            b.iter(|| black_box(bitmap.block_stream(size, 0).expect("Failed to encode blocks")))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_checksums, bench_block_stream);
criterion_main!(benches);
