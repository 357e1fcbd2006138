#![doc = include_str!("../README.md")]

mod bytes;
mod error;
mod prelude;

pub mod checksum;
pub mod layout;
pub mod scanner;
pub mod series;
pub mod source;
pub mod stream;
pub mod summary;

pub use checksum::{checksum, DefaultChecksum, IntegrityAlgorithm};
pub use error::{Error, Result};
#[cfg(feature = "serde")]
pub use layout::LayoutConfig;
pub use layout::{
    parse_format, Field, FieldType, FrameLayout, LayoutBuilder, RawValue, CRC_COLUMN, SYNC_MARKER,
};
pub use scanner::{scan, Advance, Attempts, DecodeAttempt, FrameScanner, Limit, ScanOpts};
pub use series::{decode, decode_with, Capacity, SeriesAssembler, SeriesDataset};
pub use source::{ByteSource, ReaderSource, SourceSpec};
pub use stream::{decode_reader, StreamScanner};
pub use summary::Summary;
