//! Benchmarks for the capture decode path
//!
//! Measures each stage on a synthetic print-job capture:
//! - Container decompression and two-pass timestamp reconstruction
//! - btsnoop parsing from memory
//! - HCI demux plus ATT decoding
//! - Full report construction

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use lxwire::codec::CodecConfig;
use lxwire::snooz::{SnoozContainer, SnoozPacketType, SnoozVersion};
use lxwire::test_utils::{ContainerRecord, build_container};
use lxwire::{CaptureReader, CaptureReport, decode_capture};
use std::hint::black_box;

/// Container holding a write-command per data block plus periodic notifications.
fn job_container(blocks: u16) -> Vec<u8> {
    let mut records = Vec::with_capacity(blocks as usize * 2);
    for index in 0..blocks {
        let mut body = vec![0x40, 0x20, 0x1B, 0x00, 0x17, 0x00, 0x04, 0x00, 0x52, 0x0E, 0x00];
        body.extend_from_slice(&[0x55, 0x00]);
        body.extend_from_slice(&index.to_le_bytes());
        body.extend_from_slice(&[0xA5; 16]);
        records.push(ContainerRecord::new(12, SnoozPacketType::OutboundAcl, body));

        if index % 16 == 0 {
            let mut notify = vec![0x40, 0x20, 0x0B, 0x00, 0x07, 0x00, 0x04, 0x00, 0x1B, 0x10, 0x00];
            notify.extend_from_slice(&[0x5A, 0x02, 0x00, 0x00]);
            records.push(ContainerRecord::new(3, SnoozPacketType::InboundAcl, notify));
        }
    }
    build_container(SnoozVersion::V2, 1_700_000_000_000, &records)
}

fn capture_bytes(container: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    SnoozContainer::parse(container)
        .expect("Failed to parse container")
        .write_btsnoop(&mut out)
        .expect("Failed to convert container");
    out
}

fn bench_container(c: &mut Criterion) {
    let container = job_container(1_200);

    let mut group = c.benchmark_group("container");
    group.throughput(Throughput::Bytes(container.len() as u64));

    group.bench_function("decompress_and_reconstruct", |b| {
        b.iter(|| {
            let records = SnoozContainer::parse(black_box(&container))
                .expect("Failed to parse container")
                .into_records()
                .expect("Failed to walk records");
            black_box(records.count())
        })
    });

    group.finish();
}

fn bench_capture(c: &mut Criterion) {
    let capture = capture_bytes(&job_container(1_200));
    let codec = CodecConfig::default();

    let mut group = c.benchmark_group("capture");
    group.throughput(Throughput::Bytes(capture.len() as u64));

    group.bench_function("read_records", |b| {
        b.iter(|| {
            let reader = CaptureReader::new(black_box(capture.as_slice())).expect("Bad header");
            black_box(reader.count())
        })
    });

    group.bench_function("decode_att", |b| {
        b.iter(|| {
            let reader = CaptureReader::new(black_box(capture.as_slice())).expect("Bad header");
            black_box(decode_capture(reader).count())
        })
    });

    group.bench_function("report", |b| {
        b.iter(|| {
            let reader = CaptureReader::new(black_box(capture.as_slice())).expect("Bad header");
            black_box(CaptureReport::from_records(reader, &codec).expect("Failed to report"))
        })
    });

    group.finish();
}

criterion_group!(benches, bench_container, bench_capture);
criterion_main!(benches);
