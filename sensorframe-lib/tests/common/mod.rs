#![allow(dead_code)]
use std::path::PathBuf;

use rand::{rngs::StdRng, Rng, SeedableRng};
use sensorframe::{FrameLayout, RawValue, SeriesDataset};

pub fn fixture_path(name: &str) -> PathBuf {
    let mut path =
        PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set"));
    path.push("tests/fixtures");
    path.push(name);
    path
}

pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub fn noise(rng: &mut StdRng, len: usize) -> Vec<u8> {
    (0..len).map(|_| rng.gen()).collect()
}

/// `[time: u32 * 25e-6, pos: f32]`, 11 byte frames.
pub fn time_pos_layout() -> FrameLayout {
    FrameLayout::new(&["time", "pos"], "If", &[25e-6, 1.0]).unwrap()
}

pub fn time_pos_frame(layout: &FrameLayout, time: u32, pos: f32) -> Vec<u8> {
    layout
        .encode(&[RawValue::U32(time), RawValue::F32(pos)])
        .unwrap()
}

/// Compare datasets bit-for-bit, treating NaN like any other value.
pub fn assert_bit_identical(a: &SeriesDataset, b: &SeriesDataset) {
    assert_eq!(a.len(), b.len());
    assert_eq!(a.offsets(), b.offsets());
    for ((name_a, col_a), (name_b, col_b)) in a.columns().zip(b.columns()) {
        assert_eq!(name_a, name_b);
        let bits_a: Vec<u64> = col_a.iter().map(|v| v.to_bits()).collect();
        let bits_b: Vec<u64> = col_b.iter().map(|v| v.to_bits()).collect();
        assert_eq!(bits_a, bits_b, "column {name_a} differs");
    }
}
