#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::scanner::DecodeAttempt;
use crate::series::SeriesDataset;

/// Tracks frame validity statistics over a decode.
///
/// # Example
/// ```
/// use sensorframe::{scan, FrameLayout, RawValue, Summary};
///
/// let layout = FrameLayout::new(&["count"], "H", &[1.0]).unwrap();
/// let buf = layout.encode(&[RawValue::U16(1)]).unwrap();
///
/// let mut summary = Summary::default();
/// scan(&buf, &layout).for_each(|a| summary.add(&a));
/// assert_eq!(summary.valid, 1);
/// ```
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Summary {
    /// Sync-matched attempts, i.e., dataset rows.
    pub rows: usize,
    pub valid: usize,
    pub invalid: usize,
    /// Diagnostic attempts without a sync match.
    pub unmatched: usize,
    pub first_valid_offset: Option<usize>,
    pub last_valid_offset: Option<usize>,
}

impl Summary {
    pub fn add(&mut self, attempt: &DecodeAttempt) {
        if !attempt.sync_matched {
            self.unmatched += 1;
            return;
        }
        self.rows += 1;
        if attempt.checksum_valid {
            self.record_valid(attempt.offset);
        } else {
            self.invalid += 1;
        }
    }

    fn record_valid(&mut self, offset: usize) {
        self.valid += 1;
        if self.first_valid_offset.is_none() {
            self.first_valid_offset = Some(offset);
        }
        self.last_valid_offset = Some(offset);
    }

    #[must_use]
    pub fn from_dataset(dataset: &SeriesDataset) -> Self {
        let mut summary = Summary::default();
        for (offset, crc) in dataset.offsets().iter().zip(dataset.crc().iter()) {
            summary.rows += 1;
            if *crc == 1.0 {
                summary.record_valid(*offset);
            } else {
                summary.invalid += 1;
            }
        }
        summary
    }

    /// Fraction of rows that passed the checksum, or `None` if there are no rows.
    #[must_use]
    pub fn valid_ratio(&self) -> Option<f64> {
        if self.rows == 0 {
            return None;
        }
        Some(self.valid as f64 / self.rows as f64)
    }

    /// Fraction of `len` source bytes accounted for by valid frames of `frame_size`.
    #[must_use]
    pub fn coverage(&self, len: usize, frame_size: usize) -> Option<f64> {
        if len == 0 {
            return None;
        }
        Some(((self.valid * frame_size) as f64 / len as f64).min(1.0))
    }
}
