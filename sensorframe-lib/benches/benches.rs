use rand::{rngs::StdRng, Rng, SeedableRng};
use std::io::Cursor;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use sensorframe::{
    checksum, decode, decode_reader, Capacity, FrameLayout, FrameScanner, RawValue, ScanOpts,
};

fn layout() -> FrameLayout {
    FrameLayout::new(
        &["time", "pos_m1", "pos_m2", "pos_as5047u", "vel_as5047u"],
        "Iffff",
        &[25e-6, 1.0, 1.0, 1.0, 1.0],
    )
    .unwrap()
}

// Frames with a few bytes of line noise between some of them and the odd flipped bit.
fn stream(layout: &FrameLayout, frames: u32) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(0);
    let mut buf = Vec::new();
    for i in 0..frames {
        let mut frame = layout
            .encode(&[
                RawValue::U32(i * 40),
                RawValue::F32(rng.gen()),
                RawValue::F32(rng.gen()),
                RawValue::F32(rng.gen()),
                RawValue::F32(rng.gen()),
            ])
            .unwrap();
        if i % 100 == 0 {
            frame[5] ^= 0x10;
        }
        buf.extend(frame);
        if i % 10 == 0 {
            let gap = rng.gen_range(1..8);
            buf.extend((0..gap).map(|_| rng.gen::<u8>()));
        }
    }
    buf
}

fn bench_checksum(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let buf: Vec<u8> = (0..1024).map(|_| rng.gen()).collect();

    let mut group = c.benchmark_group("checksum");
    group.throughput(Throughput::Bytes(buf.len() as u64));
    group.bench_function("crc8_maxim", |b| {
        b.iter(|| checksum(&buf));
    });
    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let layout = layout();
    let buf = stream(&layout, 10_000);

    let mut group = c.benchmark_group("scan");
    group.throughput(Throughput::Bytes(buf.len() as u64));
    group.bench_function("attempts", |b| {
        b.iter(|| FrameScanner::new(&buf, &layout).attempts().count());
    });
    group.bench_function("all_zero", |b| {
        let zeros = vec![0u8; buf.len()];
        b.iter(|| FrameScanner::new(&zeros, &layout).attempts().count());
    });
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let layout = layout();
    let buf = stream(&layout, 10_000);

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(buf.len() as u64));
    group.bench_function("in_memory", |b| {
        b.iter(|| {
            let data = decode(&buf, &layout);
            assert!(data.len() >= 10_000);
        });
    });
    group.bench_function("reader", |b| {
        b.iter(|| {
            let data =
                decode_reader(Cursor::new(&buf), &layout, ScanOpts::new(), Capacity::Grow)
                    .unwrap();
            assert!(data.len() >= 10_000);
        });
    });
    group.finish();
}

criterion_group!(benches, bench_checksum, bench_scan, bench_decode);
criterion_main!(benches);
