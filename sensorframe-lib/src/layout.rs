//! Frame layout description.
//!
//! A frame on the wire is the sync marker, the fixed-width little-endian fields
//! in layout order, and a trailing CRC-8 byte covering everything before it:
//!
//! ```text
//! [0x61][0x62][field_1]...[field_k][crc]
//! ```
use std::collections::HashSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::checksum::checksum;
use crate::prelude::*;

/// Default frame sync marker, ASCII `ab`.
pub const SYNC_MARKER: [u8; 2] = [0x61, 0x62];

/// Name of the validity column in a [SeriesDataset](crate::SeriesDataset). Not usable
/// as a field name.
pub const CRC_COLUMN: &str = "crc";

/// Supported fixed-width field encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum FieldType {
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

impl FieldType {
    /// Map a struct-style format code to a type.
    ///
    /// # Errors
    /// [Error::UnknownFormat] for anything other than `H h I L i l f d`.
    pub fn from_code(code: char) -> Result<Self> {
        Ok(match code {
            'H' => Self::U16,
            'h' => Self::I16,
            'I' | 'L' => Self::U32,
            'i' | 'l' => Self::I32,
            'f' => Self::F32,
            'd' => Self::F64,
            _ => return Err(Error::UnknownFormat(code)),
        })
    }

    #[must_use]
    pub fn code(&self) -> char {
        match self {
            Self::U16 => 'H',
            Self::I16 => 'h',
            Self::U32 => 'I',
            Self::I32 => 'i',
            Self::F32 => 'f',
            Self::F64 => 'd',
        }
    }

    /// Number of bytes this type occupies in a frame.
    #[must_use]
    pub const fn width(&self) -> usize {
        match self {
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// Decode a little-endian value from the start of `dat`, or `None` if there are
    /// not enough bytes.
    #[must_use]
    pub fn decode(&self, dat: &[u8]) -> Option<RawValue> {
        let b = dat.get(..self.width())?;
        Some(match self {
            Self::U16 => RawValue::U16(u16::from_le_bytes([b[0], b[1]])),
            Self::I16 => RawValue::I16(i16::from_le_bytes([b[0], b[1]])),
            Self::U32 => RawValue::U32(u32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            Self::I32 => RawValue::I32(i32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            Self::F32 => RawValue::F32(f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            Self::F64 => RawValue::F64(f64::from_le_bytes([
                b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
            ])),
        })
    }
}

/// A single unscaled field value as read from a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RawValue {
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    F32(f32),
    F64(f64),
}

impl RawValue {
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::U16(v) => f64::from(v),
            Self::I16(v) => f64::from(v),
            Self::U32(v) => f64::from(v),
            Self::I32(v) => f64::from(v),
            Self::F32(v) => f64::from(v),
            Self::F64(v) => v,
        }
    }

    #[must_use]
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::U16(_) => FieldType::U16,
            Self::I16(_) => FieldType::I16,
            Self::U32(_) => FieldType::U32,
            Self::I32(_) => FieldType::I32,
            Self::F32(_) => FieldType::F32,
            Self::F64(_) => FieldType::F64,
        }
    }

    fn write_le(&self, out: &mut Vec<u8>) {
        match *self {
            Self::U16(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::I16(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::U32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::I32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::F32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::F64(v) => out.extend_from_slice(&v.to_le_bytes()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Field {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: FieldType,
    /// Multiplier applied to the raw value when assembling a series.
    pub scale: f64,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldType, scale: f64) -> Self {
        Field {
            name: name.into(),
            kind,
            scale,
        }
    }
}

/// Parse a struct-style format string into field types.
///
/// Codes may be prefixed by a decimal repeat count, whitespace is ignored and a
/// single leading `<` is accepted since little-endian is the only byte order.
///
/// # Errors
/// [Error::UnknownFormat] or [Error::InvalidRepeat].
pub fn parse_format(format: &str) -> Result<Vec<FieldType>> {
    let format = format.trim_start();
    let format = format.strip_prefix('<').unwrap_or(format);

    let mut types = Vec::new();
    let mut count: Option<usize> = None;
    for c in format.chars() {
        if c.is_ascii_whitespace() {
            if count.is_some() {
                return Err(Error::InvalidRepeat(format!(
                    "whitespace between count and code in {format:?}"
                )));
            }
            continue;
        }
        if let Some(digit) = c.to_digit(10) {
            let cur = count.unwrap_or(0);
            count = Some(
                cur.checked_mul(10)
                    .and_then(|v| v.checked_add(digit as usize))
                    .ok_or_else(|| Error::InvalidRepeat(format.to_string()))?,
            );
            continue;
        }
        let kind = FieldType::from_code(c)?;
        types.extend(std::iter::repeat(kind).take(count.take().unwrap_or(1)));
    }
    if count.is_some() {
        return Err(Error::InvalidRepeat(format!(
            "trailing count without code in {format:?}"
        )));
    }
    Ok(types)
}

/// Describes one frame type: the sync marker, the ordered fields and their scales.
///
/// The frame size is fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameLayout {
    sync_marker: [u8; 2],
    fields: Vec<Field>,
    frame_size: usize,
}

impl FrameLayout {
    /// Create a layout from parallel name and scale lists and a format string with one
    /// code per name.
    ///
    /// # Example
    /// ```
    /// use sensorframe::FrameLayout;
    ///
    /// let layout = FrameLayout::new(&["time", "pos"], "If", &[25e-6, 1.0]).unwrap();
    /// assert_eq!(layout.frame_size(), 11);
    /// ```
    ///
    /// # Errors
    /// A schema [Error] if the counts disagree, a code is unknown, or a name is
    /// duplicated or reserved.
    pub fn new<S: AsRef<str>>(names: &[S], format: &str, scales: &[f64]) -> Result<Self> {
        if names.len() != scales.len() {
            return Err(Error::FieldCountMismatch {
                names: names.len(),
                scales: scales.len(),
            });
        }
        let types = parse_format(format)?;
        if types.len() != names.len() {
            return Err(Error::FormatCountMismatch {
                names: names.len(),
                codes: types.len(),
            });
        }
        let fields = names
            .iter()
            .zip(types)
            .zip(scales)
            .map(|((name, kind), scale)| Field::new(name.as_ref(), kind, *scale))
            .collect();
        Self::from_fields(fields)
    }

    /// Create a layout from already typed fields.
    ///
    /// # Errors
    /// [Error::DuplicateField] or [Error::ReservedField].
    pub fn from_fields(fields: Vec<Field>) -> Result<Self> {
        let mut seen = HashSet::new();
        for field in &fields {
            if field.name == CRC_COLUMN {
                return Err(Error::ReservedField(field.name.clone()));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(Error::DuplicateField(field.name.clone()));
            }
        }
        let frame_size =
            SYNC_MARKER.len() + fields.iter().map(|f| f.kind.width()).sum::<usize>() + 1;
        debug!(fields = fields.len(), frame_size, "created frame layout");
        Ok(FrameLayout {
            sync_marker: SYNC_MARKER,
            fields,
            frame_size,
        })
    }

    /// Start building a layout one field at a time.
    ///
    /// # Example
    /// ```
    /// use sensorframe::{FieldType, FrameLayout};
    ///
    /// let layout = FrameLayout::builder()
    ///     .with_field("time", FieldType::U32, 25e-6)
    ///     .with_field("pos", FieldType::F32, 1.0)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(layout.format(), "If");
    /// ```
    #[must_use]
    pub fn builder() -> LayoutBuilder {
        LayoutBuilder::default()
    }

    /// Use a sync marker other than [SYNC_MARKER].
    #[must_use]
    pub fn with_sync_marker(mut self, marker: [u8; 2]) -> Self {
        self.sync_marker = marker;
        self
    }

    #[must_use]
    pub fn sync_marker(&self) -> [u8; 2] {
        self.sync_marker
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Total frame length: marker, payload and checksum byte.
    #[must_use]
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Length of the field bytes between the marker and the checksum byte.
    #[must_use]
    pub fn payload_size(&self) -> usize {
        self.frame_size - self.sync_marker.len() - 1
    }

    /// The struct-style format string for this layout's fields.
    #[must_use]
    pub fn format(&self) -> String {
        self.fields.iter().map(|f| f.kind.code()).collect()
    }

    /// Decode the unscaled field values of a frame starting at its sync marker, or
    /// `None` if `frame` is shorter than the frame size.
    #[must_use]
    pub fn decode_fields(&self, frame: &[u8]) -> Option<Vec<RawValue>> {
        if frame.len() < self.frame_size {
            return None;
        }
        let mut pos = self.sync_marker.len();
        let mut values = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            values.push(field.kind.decode(&frame[pos..])?);
            pos += field.kind.width();
        }
        Some(values)
    }

    /// Build a complete frame, including marker and checksum, from raw values.
    ///
    /// Returns `None` if the number or types of `values` do not match the layout.
    #[must_use]
    pub fn encode(&self, values: &[RawValue]) -> Option<Vec<u8>> {
        if values.len() != self.fields.len() {
            return None;
        }
        let mut frame = Vec::with_capacity(self.frame_size);
        frame.extend_from_slice(&self.sync_marker);
        for (field, value) in self.fields.iter().zip(values) {
            if value.field_type() != field.kind {
                return None;
            }
            value.write_le(&mut frame);
        }
        frame.push(checksum(&frame));
        Some(frame)
    }
}

/// Incrementally collects fields for a [FrameLayout]. Created by [FrameLayout::builder].
#[derive(Debug, Clone, Default)]
pub struct LayoutBuilder {
    fields: Vec<Field>,
    sync_marker: Option<[u8; 2]>,
}

impl LayoutBuilder {
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, kind: FieldType, scale: f64) -> Self {
        self.fields.push(Field::new(name, kind, scale));
        self
    }

    #[must_use]
    pub fn with_sync_marker(mut self, marker: [u8; 2]) -> Self {
        self.sync_marker = Some(marker);
        self
    }

    /// # Errors
    /// [Error::DuplicateField] or [Error::ReservedField].
    pub fn build(self) -> Result<FrameLayout> {
        let layout = FrameLayout::from_fields(self.fields)?;
        Ok(match self.sync_marker {
            Some(marker) => layout.with_sync_marker(marker),
            None => layout,
        })
    }
}

/// Serializable layout description, e.g., loaded from a JSON layout file.
///
/// ```json
/// {"names": ["time", "pos"], "format": "If", "scales": [25e-6, 1.0]}
/// ```
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub names: Vec<String>,
    pub format: String,
    pub scales: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_marker: Option<[u8; 2]>,
}

#[cfg(feature = "serde")]
impl TryFrom<LayoutConfig> for FrameLayout {
    type Error = Error;

    fn try_from(config: LayoutConfig) -> Result<Self> {
        let layout = FrameLayout::new(&config.names, &config.format, &config.scales)?;
        Ok(match config.sync_marker {
            Some(marker) => layout.with_sync_marker(marker),
            None => layout,
        })
    }
}
