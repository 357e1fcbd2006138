use std::io::{self, ErrorKind, Read};

/// Bytes buffers a reader in chunks and hands out fixed-size windows addressed by
/// absolute stream offset.
///
/// Requesting a window marks everything before its offset as consumed. Consumed bytes
/// are dropped when the next chunk is read, so the buffer only ever carries the
/// unscanned tail of the previous chunk, i.e., fewer than a window's worth of bytes,
/// plus the newly read chunk.
pub(crate) struct Bytes<R>
where
    R: Read + Send,
{
    reader: R,
    chunk_size: usize,
    // absolute offset of cache[0]
    base: usize,
    cache: Vec<u8>,
    // index into cache of the first unconsumed byte
    start: usize,
    eof: bool,
}

impl<R> Bytes<R>
where
    R: Read + Send,
{
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Bytes {
            reader,
            chunk_size: chunk_size.max(1),
            base: 0,
            cache: Vec::new(),
            start: 0,
            eof: false,
        }
    }

    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        self.chunk_size = chunk_size.max(1);
    }

    /// Total number of bytes read from the reader.
    pub fn num_read(&self) -> usize {
        self.base + self.cache.len()
    }

    fn discard_before(&mut self, offset: usize) {
        self.start = offset.saturating_sub(self.base).min(self.cache.len());
    }

    // Drop consumed bytes and append one chunk.
    fn read_chunk(&mut self) -> io::Result<()> {
        self.cache.drain(..self.start);
        self.base += self.start;
        self.start = 0;

        let start = self.cache.len();
        self.cache.resize(start + self.chunk_size, 0);
        loop {
            match self.reader.read(&mut self.cache[start..]) {
                Ok(n) => {
                    self.cache.truncate(start + n);
                    if n == 0 {
                        self.eof = true;
                    }
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.cache.truncate(start);
                    return Err(err);
                }
            }
        }
    }

    /// Get the `len` bytes starting at absolute `offset`, reading more if necessary.
    ///
    /// Returns `Ok(None)` if the stream ends first. `offset` must not be less than the
    /// offset of any previously requested window.
    pub fn window(&mut self, offset: usize, len: usize) -> io::Result<Option<&[u8]>> {
        self.discard_before(offset);
        while self.base + self.start < offset || self.cache.len() - self.start < len {
            if self.eof {
                return Ok(None);
            }
            self.read_chunk()?;
            self.discard_before(offset);
        }
        Ok(Some(&self.cache[self.start..self.start + len]))
    }
}
