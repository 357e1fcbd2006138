//! Raw byte acquisition.
//!
//! The decoder only ever sees the bytes a [ByteSource] produces; where they came from
//! is the source's business.
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use tracing::debug;

use crate::prelude::*;

/// Produces the raw telemetry bytes to decode.
pub trait ByteSource {
    /// Acquire a complete buffer.
    ///
    /// # Errors
    /// Any [Error] acquiring the data.
    fn acquire(&mut self) -> Result<Vec<u8>>;
}

/// Reads up to a fixed number of bytes from a reader.
pub struct ReaderSource<R>
where
    R: Read,
{
    reader: R,
    max_bytes: usize,
}

impl<R> ReaderSource<R>
where
    R: Read,
{
    /// Default acquisition size of a single dump.
    pub const DEFAULT_MAX_BYTES: usize = 10_000_000;

    pub fn new(reader: R) -> Self {
        ReaderSource {
            reader,
            max_bytes: Self::DEFAULT_MAX_BYTES,
        }
    }

    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

impl<R> ByteSource for ReaderSource<R>
where
    R: Read,
{
    fn acquire(&mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.reader
            .by_ref()
            .take(self.max_bytes as u64)
            .read_to_end(&mut buf)?;
        debug!(bytes = buf.len(), max = self.max_bytes, "acquired");
        Ok(buf)
    }
}

/// Identifies a telemetry link by a URL-like resource and its bit rate.
///
/// Bare paths and `file://` URLs are supported. Serial devices, e.g.,
/// `/dev/ttyUSB0`, are opened as files and must already be configured for
/// `baudrate`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceSpec {
    pub url: String,
    pub baudrate: u32,
}

impl SourceSpec {
    pub const DEFAULT_BAUDRATE: u32 = 12_000_000;

    pub fn new(url: impl Into<String>) -> Self {
        SourceSpec {
            url: url.into(),
            baudrate: Self::DEFAULT_BAUDRATE,
        }
    }

    #[must_use]
    pub fn with_baudrate(mut self, baudrate: u32) -> Self {
        self.baudrate = baudrate;
        self
    }

    /// Resolve to a local path.
    ///
    /// # Errors
    /// [Error::UnsupportedSource] for URL schemes other than `file`.
    pub fn path(&self) -> Result<PathBuf> {
        if let Some(path) = self.url.strip_prefix("file://") {
            return Ok(PathBuf::from(path));
        }
        match self.url.split_once("://") {
            Some((scheme, _)) => Err(Error::UnsupportedSource(format!(
                "{scheme} scheme in {}",
                self.url
            ))),
            None => Ok(PathBuf::from(&self.url)),
        }
    }

    /// Open the source for reading.
    ///
    /// # Errors
    /// [Error::UnsupportedSource] or [Error::Io] opening the path.
    pub fn open(&self) -> Result<ReaderSource<File>> {
        let path = self.path()?;
        debug!(?path, baudrate = self.baudrate, "opening source");
        Ok(ReaderSource::new(File::open(path)?))
    }
}
