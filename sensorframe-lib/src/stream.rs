use std::io::Read;

use tracing::{debug, info};

use crate::bytes::Bytes;
use crate::checksum::{DefaultChecksum, IntegrityAlgorithm};
use crate::layout::FrameLayout;
use crate::prelude::*;
use crate::scanner::{Cursor, DecodeAttempt, ScanOpts};
use crate::series::{Capacity, SeriesAssembler, SeriesDataset};

/// Scans a byte stream for frames, reading it in chunks.
///
/// Offsets in the produced [DecodeAttempt]s are absolute stream offsets. Between
/// chunks the scanner keeps the trailing bytes that do not yet hold a complete frame,
/// so for the same bytes and [ScanOpts] it produces exactly what
/// [FrameScanner](crate::FrameScanner) produces for an in-memory buffer, except that
/// [Limit::FromLength](crate::Limit::FromLength) is unbounded because the stream
/// length is not known.
///
/// # Errors
/// Read errors other than [std::io::ErrorKind::Interrupted] are produced as an
/// `Err` item, after which the iterator ends.
pub struct StreamScanner<R>
where
    R: Read + Send,
{
    bytes: Bytes<R>,
    layout: FrameLayout,
    integrity: Box<dyn IntegrityAlgorithm>,
    cursor: Cursor,
    done: bool,
}

impl<R> StreamScanner<R>
where
    R: Read + Send,
{
    pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

    pub fn new(reader: R, layout: FrameLayout) -> Self {
        let cursor = Cursor::new(&ScanOpts::default(), None, layout.frame_size());
        StreamScanner {
            bytes: Bytes::new(reader, Self::DEFAULT_CHUNK_SIZE),
            layout,
            integrity: Box::new(DefaultChecksum),
            cursor,
            done: false,
        }
    }

    /// Set scan options. Must be called before iterating.
    #[must_use]
    pub fn with_opts(mut self, opts: ScanOpts) -> Self {
        self.cursor = Cursor::new(&opts, None, self.layout.frame_size());
        self
    }

    /// Number of bytes requested from the reader per read.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.bytes.set_chunk_size(chunk_size);
        self
    }

    #[must_use]
    pub fn with_integrity(mut self, integrity: Box<dyn IntegrityAlgorithm>) -> Self {
        self.integrity = integrity;
        self
    }

    #[must_use]
    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// Total bytes read from the underlying reader so far.
    #[must_use]
    pub fn bytes_read(&self) -> usize {
        self.bytes.num_read()
    }
}

impl<R> Iterator for StreamScanner<R>
where
    R: Read + Send,
{
    type Item = Result<DecodeAttempt>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let frame_size = self.layout.frame_size();
        while !self.cursor.exhausted() {
            let window = match self.bytes.window(self.cursor.pos, frame_size) {
                Ok(Some(window)) => window,
                Ok(None) => break,
                Err(err) => {
                    self.done = true;
                    return Some(Err(Error::Io(err)));
                }
            };
            if let Some(attempt) = self.cursor.step(&self.layout, &*self.integrity, window) {
                if attempt.sync_matched && self.cursor.progress_due() {
                    info!(
                        rows = self.cursor.matched,
                        "scanned {} bytes",
                        attempt.offset
                    );
                }
                return Some(Ok(attempt));
            }
        }
        self.done = true;
        debug!(
            matched = self.cursor.matched,
            offset = self.cursor.pos,
            read = self.bytes.num_read(),
            "stream scan complete"
        );
        None
    }
}

/// Decode every frame from `reader`.
///
/// # Errors
/// [Error::Io] if reading fails, or [Error::CapacityExceeded] when `capacity` is a hard
/// cap that fills up.
pub fn decode_reader<R>(
    reader: R,
    layout: &FrameLayout,
    opts: ScanOpts,
    capacity: Capacity,
) -> Result<SeriesDataset>
where
    R: Read + Send,
{
    let scanner = StreamScanner::new(reader, layout.clone()).with_opts(opts);
    let mut assembler = SeriesAssembler::new(layout).with_capacity(capacity);
    for attempt in scanner {
        assembler.push(&attempt?)?;
    }
    Ok(assembler.finish())
}
