mod common;

use std::fs;

use rand::Rng;
use sensorframe::*;
use test_case::test_case;

use common::{
    assert_bit_identical, fixture_path, noise, rng, time_pos_frame, time_pos_layout,
};

#[test_case(b"", 0x00; "empty")]
#[test_case(b"123456789", 0xa1; "check string")]
#[test_case(&[0x02, 0x1c, 0xb8, 0x01, 0x00, 0x00, 0x00], 0xa2; "ds2401 rom")]
fn checksum_vectors(dat: &[u8], expected: u8) {
    assert_eq!(checksum(dat), expected);
}

#[test]
fn finds_every_embedded_frame() {
    let layout = time_pos_layout();
    let mut rng = rng(1);

    let mut buf = Vec::new();
    let mut embedded: Vec<(usize, u32, f32)> = Vec::new();
    for _ in 0..500 {
        let gap = rng.gen_range(0..30);
        buf.extend(noise(&mut rng, gap));
        let (time, pos): (u32, f32) = (rng.gen(), rng.gen());
        embedded.push((buf.len(), time, pos));
        buf.extend(time_pos_frame(&layout, time, pos));
    }

    let data = decode_with(
        &buf,
        &layout,
        ScanOpts::new().with_limit(Limit::Unbounded),
        Capacity::Grow,
    )
    .unwrap();

    assert!(data.offsets().windows(2).all(|w| w[0] < w[1]));
    let time = data.column("time").unwrap();
    let pos = data.column("pos").unwrap();
    let mut row = 0;
    for (offset, raw_time, raw_pos) in embedded {
        // embedded frames appear in order, possibly among false matches
        while data.offsets()[row] != offset {
            row += 1;
        }
        assert_eq!(data.crc()[row], 1.0, "frame at {offset}");
        assert_eq!(time[row], f64::from(raw_time) * 25e-6);
        assert_eq!(pos[row], f64::from(raw_pos));
    }
}

#[test]
fn false_accept_rate_of_corrupt_frames() {
    let layout = time_pos_layout();
    let mut rng = rng(2);

    // sync marker followed by garbage: the checksum is the only defense
    let mut buf = Vec::new();
    for _ in 0..20_000 {
        buf.extend(SYNC_MARKER);
        buf.extend(noise(&mut rng, layout.frame_size() - 2));
    }

    let mut summary = Summary::default();
    FrameScanner::new(&buf, &layout)
        .with_opts(ScanOpts::new().with_limit(Limit::Unbounded))
        .attempts()
        .for_each(|a| summary.add(&a));

    assert!(summary.rows >= 20_000);
    // expect ~1/256 of sync matches to pass by chance
    let ratio = summary.valid_ratio().unwrap();
    assert!(
        (0.5 / 256.0..1.5 / 256.0).contains(&ratio),
        "false accept ratio {ratio} valid={}",
        summary.valid
    );
}

#[test]
fn pure_noise_rarely_matches() {
    let layout = time_pos_layout();
    let buf = noise(&mut rng(3), 1 << 20);

    let summary = Summary::from_dataset(&decode(&buf, &layout));
    // ~16 expected sync matches in 1MiB
    assert!(summary.rows < 64, "rows={}", summary.rows);
    assert!(summary.valid <= 2, "valid={}", summary.valid);
    assert_eq!(summary.valid + summary.invalid, summary.rows);
}

#[test]
fn decode_is_idempotent() {
    let layout = time_pos_layout();
    let mut rng = rng(4);
    let mut buf = Vec::new();
    for i in 0..100u32 {
        buf.extend(time_pos_frame(&layout, i, i as f32));
        buf.extend(noise(&mut rng, 3));
        // corrupt some frames so the dataset contains NaN
        if i % 7 == 0 {
            let idx = buf.len() - 6;
            buf[idx] ^= 0xff;
        }
    }

    let first = decode(&buf, &layout);
    let second = decode(&buf, &layout);
    assert!(first.column("pos").unwrap().iter().any(|v| v.is_nan()));
    assert_bit_identical(&first, &second);
}

#[test_case(1; "one byte")]
#[test_case(2; "two bytes")]
#[test_case(3; "three bytes")]
#[test_case(5; "five bytes")]
#[test_case(9; "nine bytes")]
#[test_case(10; "ten bytes")]
fn resynchronizes_after_dropped_bytes(k: usize) {
    let layout = time_pos_layout();
    let a = time_pos_frame(&layout, 1000, 0.5);
    let c = time_pos_frame(&layout, 2000, 1.5);
    let d = time_pos_frame(&layout, 3000, 2.5);

    let mut buf = a[..a.len() - k].to_vec();
    let c_offset = buf.len();
    buf.extend(&c);
    buf.extend(&d);

    let data = decode(&buf, &layout);
    assert_eq!(data.offsets()[0], 0);
    assert_eq!(data.crc()[0], 0.0);
    assert!(data.column("time").unwrap()[0].is_nan());

    assert_eq!(data.offsets()[1], c_offset);
    assert_eq!(data.crc()[1], 1.0);
    assert_eq!(data.column("time").unwrap()[1], 2000.0 * 25e-6);
}

#[test]
fn frame_skip_misses_frame_after_truncated_one() {
    let layout = time_pos_layout();
    let a = time_pos_frame(&layout, 1000, 0.5);
    let c = time_pos_frame(&layout, 2000, 1.5);
    let mut buf = a[..a.len() - 3].to_vec();
    buf.extend(&c);
    buf.extend(&c);

    let opts = ScanOpts::new()
        .with_advance(Advance::ByFrame)
        .with_limit(Limit::Unbounded);
    let offsets: Vec<usize> = FrameScanner::new(&buf, &layout)
        .with_opts(opts)
        .attempts()
        .map(|a| a.offset)
        .collect();
    // the frame at 8 is inside the skipped window
    assert_eq!(offsets, vec![0, 19]);
}

#[test]
fn two_frames_separated_by_noise() {
    let layout = time_pos_layout();
    assert_eq!(layout.frame_size(), 11);

    let frame = time_pos_frame(&layout, 123_456, -0.75);
    let mut buf = frame.clone();
    buf.extend([0xde, 0xad, 0xbe, 0xef, 0x00]);
    buf.extend(&frame);

    let data = decode(&buf, &layout);
    assert_eq!(data.len(), 2);
    assert_eq!(data.crc().to_vec(), vec![1.0, 1.0]);
    let time = data.column("time").unwrap();
    assert_eq!(time[0], time[1]);
    assert_eq!(time[0], 123_456.0 * 25e-6);
    assert_eq!(data.column("pos").unwrap().to_vec(), vec![-0.75, -0.75]);
    assert_eq!(data.offsets(), &[0, 16]);
}

#[test]
fn all_zero_buffer_never_syncs() {
    let layout = time_pos_layout();
    let buf = vec![0u8; 1000];

    let attempts: Vec<DecodeAttempt> = FrameScanner::new(&buf, &layout)
        .with_opts(ScanOpts::new().with_diagnostics(true))
        .attempts()
        .collect();
    assert_eq!(attempts.len(), 1000 - layout.frame_size() + 1);
    assert!(attempts.iter().all(|a| !a.sync_matched));

    let data = decode(&buf, &layout);
    assert!(data.is_empty());
    assert_eq!(data.valid_count(), 0);
}

fn five_channel_layout() -> FrameLayout {
    FrameLayout::new(
        &["time", "pos_m1", "pos_m2", "pos_as5047u", "vel_as5047u"],
        "Iffff",
        &[25e-6, 1.0, 1.0, 1.0, 1.0],
    )
    .unwrap()
}

// Fixture: 200 frames at 40 ticks per frame after 3 bytes of a partial frame. Every
// frame i with i % 37 == 5 lost a byte, every other frame with i % 23 == 11 has a
// flipped bit, and 13 random bytes follow every 50th frame.
#[test]
fn five_channel_fixture() {
    let layout = five_channel_layout();
    assert_eq!(layout.frame_size(), 23);
    let buf = fs::read(fixture_path("five_channel.dat")).unwrap();

    let data = decode(&buf, &layout);
    assert_eq!(data.len(), 200);
    assert_eq!(data.valid_count(), 185);
    assert_eq!(data.offsets()[0], 3);

    let time = data.column("time").unwrap();
    assert_eq!(time[0], 0.0);
    assert_eq!(time[data.len() - 1], 7960.0 * 25e-6);

    let summary = Summary::from_dataset(&data);
    assert_eq!(summary.invalid, 15);
    assert_eq!(summary.first_valid_offset, Some(3));
}

#[test]
fn five_channel_fixture_streamed() {
    let layout = five_channel_layout();
    let file = fs::File::open(fixture_path("five_channel.dat")).unwrap();
    let buf = fs::read(fixture_path("five_channel.dat")).unwrap();

    let streamed = decode_reader(file, &layout, ScanOpts::new(), Capacity::Grow).unwrap();
    let in_memory = decode(&buf, &layout);
    // no truncation by length bound here; both see all 200 frames
    assert_bit_identical(&streamed, &in_memory);
}

#[test]
fn five_channel_fixture_through_source() {
    let layout = five_channel_layout();
    let mut source = SourceSpec::new(fixture_path("five_channel.dat").to_string_lossy())
        .open()
        .unwrap();
    let buf = source.acquire().unwrap();
    assert_eq!(decode(&buf, &layout).valid_count(), 185);
}
