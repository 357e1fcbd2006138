use ndarray::Array1;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::ser::{Serialize, SerializeMap, SerializeStruct, Serializer};

use crate::layout::{FrameLayout, CRC_COLUMN};
use crate::prelude::*;
use crate::scanner::{DecodeAttempt, FrameScanner, ScanOpts};

/// Storage policy for a [SeriesAssembler].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Capacity {
    /// Grow storage as rows arrive.
    #[default]
    Grow,
    /// Fail with [Error::CapacityExceeded] on the row after this many.
    HardCap(usize),
}

/// Column-aligned series decoded from a byte stream.
///
/// Row `i` of every column describes the `i`th sync-matched attempt. The `crc`
/// column is 1.0 for rows that passed the checksum and 0.0 otherwise; field columns
/// hold `raw * scale` for valid rows and NaN for the rest.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesDataset {
    names: Vec<String>,
    columns: Vec<Array1<f64>>,
    offsets: Vec<usize>,
}

impl SeriesDataset {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Column names: the layout's fields in order, then `crc`.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Array1<f64>> {
        let idx = self.names.iter().position(|n| n == name)?;
        Some(&self.columns[idx])
    }

    /// The validity column.
    #[must_use]
    pub fn crc(&self) -> &Array1<f64> {
        // always the last column
        &self.columns[self.columns.len() - 1]
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Array1<f64>)> {
        self.names().zip(self.columns.iter())
    }

    /// Source byte offset of each row.
    #[must_use]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// All column values for one row, in column order.
    #[must_use]
    pub fn row(&self, idx: usize) -> Option<Vec<f64>> {
        if idx >= self.len() {
            return None;
        }
        Some(self.columns.iter().map(|c| c[idx]).collect())
    }

    /// Number of rows that passed the checksum.
    #[must_use]
    pub fn valid_count(&self) -> usize {
        self.crc().iter().filter(|v| **v == 1.0).count()
    }
}

#[cfg(feature = "serde")]
struct ColumnMap<'a>(&'a SeriesDataset);

#[cfg(feature = "serde")]
impl Serialize for ColumnMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.names.len()))?;
        for (name, column) in self.0.columns() {
            map.serialize_entry(name, &column.to_vec())?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
impl Serialize for SeriesDataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("SeriesDataset", 3)?;
        s.serialize_field("length", &self.len())?;
        s.serialize_field("offsets", &self.offsets)?;
        s.serialize_field("columns", &ColumnMap(self))?;
        s.end()
    }
}

/// Reduces [DecodeAttempt]s into a [SeriesDataset].
///
/// Attempts without a sync match are ignored; they do not produce rows.
pub struct SeriesAssembler<'a> {
    layout: &'a FrameLayout,
    capacity: Capacity,
    // one per field, plus crc
    columns: Vec<Vec<f64>>,
    offsets: Vec<usize>,
}

impl<'a> SeriesAssembler<'a> {
    pub fn new(layout: &'a FrameLayout) -> Self {
        SeriesAssembler {
            layout,
            capacity: Capacity::Grow,
            columns: vec![Vec::new(); layout.fields().len() + 1],
            offsets: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: Capacity) -> Self {
        self.capacity = capacity;
        self
    }

    /// Pre-size storage for `rows` rows. This is only a hint; see [Capacity]. A hint
    /// too large to allocate is ignored.
    #[must_use]
    pub fn with_size_hint(mut self, rows: usize) -> Self {
        let rows = rows.saturating_sub(self.offsets.len());
        let reserved = self
            .columns
            .iter_mut()
            .all(|col| col.try_reserve(rows).is_ok())
            && self.offsets.try_reserve(rows).is_ok();
        if !reserved {
            debug!(rows, "size hint ignored");
        }
        self
    }

    /// Number of rows so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Add the row for `attempt`.
    ///
    /// # Errors
    /// [Error::CapacityExceeded] if the assembler is hard-capped and full.
    pub fn push(&mut self, attempt: &DecodeAttempt) -> Result<()> {
        if !attempt.sync_matched {
            return Ok(());
        }
        if let Capacity::HardCap(capacity) = self.capacity {
            if self.len() >= capacity {
                return Err(Error::CapacityExceeded { capacity });
            }
        }
        self.record(attempt);
        Ok(())
    }

    // Caller ensures `attempt` is sync-matched.
    fn record(&mut self, attempt: &DecodeAttempt) {
        let (fields, crc) = self.columns.split_at_mut(self.layout.fields().len());
        let valid = attempt.checksum_valid;
        crc[0].push(if valid { 1.0 } else { 0.0 });

        let raw = attempt.raw_fields.as_deref().filter(|_| valid);
        for (idx, (field, column)) in self.layout.fields().iter().zip(fields).enumerate() {
            let value = raw
                .and_then(|r| r.get(idx))
                .map_or(f64::NAN, |v| v.as_f64() * field.scale);
            column.push(value);
        }
        self.offsets.push(attempt.offset);
    }

    /// Push every attempt from `attempts`.
    ///
    /// # Errors
    /// [Error::CapacityExceeded] if the assembler is hard-capped and fills up.
    pub fn extend<I>(&mut self, attempts: I) -> Result<()>
    where
        I: IntoIterator<Item = DecodeAttempt>,
    {
        for attempt in attempts {
            self.push(&attempt)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn finish(self) -> SeriesDataset {
        let mut names: Vec<String> = self
            .layout
            .fields()
            .iter()
            .map(|f| f.name.clone())
            .collect();
        names.push(CRC_COLUMN.to_string());
        let dataset = SeriesDataset {
            names,
            columns: self.columns.into_iter().map(Array1::from_vec).collect(),
            offsets: self.offsets,
        };
        debug!(
            rows = dataset.len(),
            valid = dataset.valid_count(),
            "assembled series"
        );
        dataset
    }

    /// Consume `attempts` and build the dataset.
    ///
    /// # Errors
    /// [Error::CapacityExceeded] if the assembler is hard-capped and fills up.
    pub fn assemble<I>(mut self, attempts: I) -> Result<SeriesDataset>
    where
        I: IntoIterator<Item = DecodeAttempt>,
    {
        self.extend(attempts)?;
        Ok(self.finish())
    }
}

/// Decode every frame in `buf`.
///
/// Scans every byte offset, bounded to `buf.len() / frame_size` sync-matched
/// attempts, and grows the dataset as needed. Corrupt frames become rows with
/// `crc == 0.0`; nothing in the buffer can make the decode fail.
///
/// # Example
/// ```
/// use sensorframe::{decode, FrameLayout, RawValue};
///
/// let layout = FrameLayout::new(&["time", "pos"], "If", &[25e-6, 1.0]).unwrap();
/// let frame = layout.encode(&[RawValue::U32(40_000), RawValue::F32(0.5)]).unwrap();
///
/// let data = decode(&frame, &layout);
/// assert_eq!(data.len(), 1);
/// assert_eq!(data.column("time").unwrap()[0], 40_000.0 * 25e-6);
/// assert_eq!(data.crc()[0], 1.0);
/// ```
#[must_use]
pub fn decode(buf: &[u8], layout: &FrameLayout) -> SeriesDataset {
    let scanner = FrameScanner::new(buf, layout);
    let mut assembler = SeriesAssembler::new(layout).with_size_hint(row_hint(&scanner, buf));
    for attempt in scanner.attempts().filter(|a| a.sync_matched) {
        assembler.record(&attempt);
    }
    assembler.finish()
}

// Rows expected from a scan of `buf`: the attempt bound, but never more than the
// number of whole frames the buffer holds.
fn row_hint(scanner: &FrameScanner<'_>, buf: &[u8]) -> usize {
    let frames = buf.len() / scanner.layout().frame_size();
    scanner.max_attempts().map_or(frames, |max| max.min(frames))
}

/// Decode `buf` with explicit scan options and storage policy.
///
/// # Errors
/// [Error::CapacityExceeded] only when `capacity` is [Capacity::HardCap].
pub fn decode_with(
    buf: &[u8],
    layout: &FrameLayout,
    opts: ScanOpts,
    capacity: Capacity,
) -> Result<SeriesDataset> {
    let scanner = FrameScanner::new(buf, layout).with_opts(opts);
    SeriesAssembler::new(layout)
        .with_size_hint(row_hint(&scanner, buf))
        .with_capacity(capacity)
        .assemble(scanner.attempts())
}
