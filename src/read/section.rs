//! Buffered views over byte ranges of the shared source.

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::{Arc, Mutex};

use crate::solid::pool;

/// A read-only view of a byte range of the archive source.
///
/// Several packed streams of one folder can be live at once (BCJ2 pulls
/// from four), so each view seeks the shared source before every refill.
/// Reads are buffered through a pooled input buffer, returned to the pool
/// when the view is dropped.
pub(crate) struct SectionReader<R> {
    source: Arc<Mutex<R>>,
    offset: u64,
    remaining: u64,
    buf: Vec<u8>,
    buf_pos: usize,
    buf_len: usize,
}

impl<R: Read + Seek> SectionReader<R> {
    /// Creates a view of `len` bytes starting at absolute `offset`.
    pub fn new(source: Arc<Mutex<R>>, offset: u64, len: u64) -> Self {
        Self {
            source,
            offset,
            remaining: len,
            buf: pool::acquire(),
            buf_pos: 0,
            buf_len: 0,
        }
    }

    fn fill(&mut self) -> io::Result<()> {
        let want = self.remaining.min(self.buf.len() as u64) as usize;

        let mut source = self
            .source
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        source.seek(SeekFrom::Start(self.offset))?;
        let n = source.read(&mut self.buf[..want])?;

        self.offset += n as u64;
        self.remaining -= n as u64;
        self.buf_pos = 0;
        self.buf_len = n;
        Ok(())
    }
}

impl<R: Read + Seek> Read for SectionReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.buf_pos >= self.buf_len {
            if self.remaining == 0 {
                return Ok(0);
            }
            self.fill()?;
            if self.buf_len == 0 {
                return Ok(0);
            }
        }

        let available = &self.buf[self.buf_pos..self.buf_len];
        let to_copy = available.len().min(buf.len());
        buf[..to_copy].copy_from_slice(&available[..to_copy]);
        self.buf_pos += to_copy;
        Ok(to_copy)
    }
}

impl<R> Drop for SectionReader<R> {
    fn drop(&mut self) {
        pool::release(std::mem::take(&mut self.buf));
    }
}
