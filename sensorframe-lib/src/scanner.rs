use tracing::{debug, info, trace};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::checksum::{DefaultChecksum, IntegrityAlgorithm};
use crate::layout::{FrameLayout, RawValue};

/// How far the scan moves after a sync-matched attempt.
///
/// Offsets without a sync match always advance by one byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Advance {
    /// Examine every offset, including those inside a frame that just matched. This
    /// resynchronizes after any number of dropped bytes and may report additional
    /// attempts for sync-like byte pairs inside a payload.
    #[default]
    ByOne,
    /// Skip the rest of a frame after a sync match, valid or not.
    ByFrame,
}

/// Bound on the number of sync-matched attempts a scan produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Limit {
    /// `buffer length / frame size`. For streams, where the length is not known up
    /// front, this is unbounded.
    #[default]
    FromLength,
    Max(usize),
    Unbounded,
}

impl Limit {
    fn resolve(self, len: Option<usize>, frame_size: usize) -> Option<usize> {
        match self {
            Limit::FromLength => len.map(|len| len / frame_size),
            Limit::Max(n) => Some(n),
            Limit::Unbounded => None,
        }
    }
}

/// Options controlling a scan.
#[derive(Clone, Debug, Default)]
pub struct ScanOpts {
    pub advance: Advance,
    pub limit: Limit,
    /// Also emit an attempt for every offset without a sync match.
    pub diagnostics: bool,
}

impl ScanOpts {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_advance(mut self, advance: Advance) -> Self {
        self.advance = advance;
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: Limit) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: bool) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

/// The result of testing one offset for a frame.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecodeAttempt {
    /// Offset of the first marker byte in the source.
    pub offset: usize,
    pub sync_matched: bool,
    /// Only meaningful if `sync_matched`.
    pub checksum_valid: bool,
    /// Unscaled field values, present when `sync_matched`.
    pub raw_fields: Option<Vec<RawValue>>,
    /// Checksum byte carried by the frame, present when `sync_matched`.
    pub checksum: Option<u8>,
    /// Checksum computed over the marker and payload, present when `sync_matched`.
    pub expected: Option<u8>,
}

impl DecodeAttempt {
    fn no_match(offset: usize) -> Self {
        DecodeAttempt {
            offset,
            sync_matched: false,
            checksum_valid: false,
            raw_fields: None,
            checksum: None,
            expected: None,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.sync_matched && self.checksum_valid
    }
}

/// Number of sync-matched attempts between progress log messages.
pub const PROGRESS_INTERVAL: usize = 10_000;

/// Offset bookkeeping shared by the in-memory and streaming scanners.
#[derive(Clone, Debug)]
pub(crate) struct Cursor {
    advance: Advance,
    diagnostics: bool,
    max_matched: Option<usize>,
    /// Absolute offset of the next window to examine.
    pub(crate) pos: usize,
    pub(crate) matched: usize,
}

impl Cursor {
    pub(crate) fn new(opts: &ScanOpts, len: Option<usize>, frame_size: usize) -> Self {
        Cursor {
            advance: opts.advance,
            diagnostics: opts.diagnostics,
            max_matched: opts.limit.resolve(len, frame_size),
            pos: 0,
            matched: 0,
        }
    }

    /// True right after every [PROGRESS_INTERVAL]th sync match.
    pub(crate) fn progress_due(&self) -> bool {
        self.matched > 0 && self.matched % PROGRESS_INTERVAL == 0
    }

    pub(crate) fn exhausted(&self) -> bool {
        self.max_matched.is_some_and(|max| self.matched >= max)
    }

    /// Examine `window`, the `frame_size` bytes starting at `self.pos`, and move the
    /// cursor. Returns the attempt to emit, if any.
    pub(crate) fn step(
        &mut self,
        layout: &FrameLayout,
        integrity: &dyn IntegrityAlgorithm,
        window: &[u8],
    ) -> Option<DecodeAttempt> {
        let offset = self.pos;
        if window[..2] != layout.sync_marker() {
            self.pos += 1;
            return self.diagnostics.then(|| DecodeAttempt::no_match(offset));
        }

        let (checksum, dat) = window.split_last()?;
        let expected = integrity.compute(dat);
        let attempt = DecodeAttempt {
            offset,
            sync_matched: true,
            checksum_valid: expected == *checksum,
            raw_fields: layout.decode_fields(window),
            checksum: Some(*checksum),
            expected: Some(expected),
        };
        trace!(
            offset,
            valid = attempt.checksum_valid,
            checksum,
            expected,
            "sync match"
        );

        self.matched += 1;
        self.pos += match self.advance {
            Advance::ByOne => 1,
            Advance::ByFrame => layout.frame_size(),
        };
        Some(attempt)
    }
}

/// Scans an in-memory buffer for frames.
///
/// The scanner is a cheap, reusable value; each call to [FrameScanner::attempts]
/// starts a new scan from offset 0 and produces the same sequence.
///
/// # Example
/// ```
/// use sensorframe::{FrameLayout, FrameScanner, RawValue};
///
/// let layout = FrameLayout::new(&["count"], "H", &[1.0]).unwrap();
/// let mut buf = vec![0xff, 0x00];
/// buf.extend(layout.encode(&[RawValue::U16(7)]).unwrap());
///
/// let attempts: Vec<_> = FrameScanner::new(&buf, &layout).attempts().collect();
/// assert_eq!(attempts.len(), 1);
/// assert_eq!(attempts[0].offset, 2);
/// assert!(attempts[0].is_valid());
/// ```
#[derive(Clone)]
pub struct FrameScanner<'a> {
    buf: &'a [u8],
    layout: &'a FrameLayout,
    opts: ScanOpts,
    integrity: &'a dyn IntegrityAlgorithm,
}

impl<'a> FrameScanner<'a> {
    pub fn new(buf: &'a [u8], layout: &'a FrameLayout) -> Self {
        FrameScanner {
            buf,
            layout,
            opts: ScanOpts::default(),
            integrity: &DefaultChecksum,
        }
    }

    #[must_use]
    pub fn with_opts(mut self, opts: ScanOpts) -> Self {
        self.opts = opts;
        self
    }

    /// Validate frames with something other than the Maxim CRC-8.
    #[must_use]
    pub fn with_integrity(mut self, integrity: &'a dyn IntegrityAlgorithm) -> Self {
        self.integrity = integrity;
        self
    }

    #[must_use]
    pub fn layout(&self) -> &'a FrameLayout {
        self.layout
    }

    /// Upper bound on the number of sync-matched attempts, if the scan is bounded.
    #[must_use]
    pub fn max_attempts(&self) -> Option<usize> {
        self.opts
            .limit
            .resolve(Some(self.buf.len()), self.layout.frame_size())
    }

    /// Start a new scan.
    #[must_use]
    pub fn attempts(&self) -> Attempts<'a> {
        Attempts {
            buf: self.buf,
            layout: self.layout,
            integrity: self.integrity,
            cursor: Cursor::new(&self.opts, Some(self.buf.len()), self.layout.frame_size()),
            done: false,
        }
    }
}

impl<'a> IntoIterator for &FrameScanner<'a> {
    type Item = DecodeAttempt;
    type IntoIter = Attempts<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.attempts()
    }
}

/// Iterator over the [DecodeAttempt]s of one scan. Created by [FrameScanner::attempts].
pub struct Attempts<'a> {
    buf: &'a [u8],
    layout: &'a FrameLayout,
    integrity: &'a dyn IntegrityAlgorithm,
    cursor: Cursor,
    done: bool,
}

impl Iterator for Attempts<'_> {
    type Item = DecodeAttempt;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let frame_size = self.layout.frame_size();
        while !self.cursor.exhausted() && self.cursor.pos + frame_size <= self.buf.len() {
            let start = self.cursor.pos;
            let window = &self.buf[start..start + frame_size];
            if let Some(attempt) = self.cursor.step(self.layout, self.integrity, window) {
                if attempt.sync_matched && self.cursor.progress_due() {
                    info!(
                        rows = self.cursor.matched,
                        "scan {}% complete",
                        attempt.offset * 100 / self.buf.len()
                    );
                }
                return Some(attempt);
            }
        }
        self.done = true;
        debug!(
            matched = self.cursor.matched,
            offset = self.cursor.pos,
            len = self.buf.len(),
            "scan complete"
        );
        None
    }
}

/// Scan `buf` for frames using the default options.
///
/// See [FrameScanner] for more control over the scan.
pub fn scan<'a>(buf: &'a [u8], layout: &'a FrameLayout) -> Attempts<'a> {
    FrameScanner::new(buf, layout).attempts()
}
