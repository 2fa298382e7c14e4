//! Copy codec (no compression).

use std::io::{self, Read};

/// A decoder that passes data through unchanged, bounded by the declared
/// unpack size.
pub struct CopyDecoder<R> {
    inner: R,
    remaining: u64,
}

impl<R: Read> CopyDecoder<R> {
    /// Creates a new copy decoder reading at most `size` bytes.
    pub fn new(inner: R, size: u64) -> Self {
        Self {
            inner,
            remaining: size,
        }
    }
}

impl<R: Read> Read for CopyDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }

        let max_read = (self.remaining.min(buf.len() as u64)) as usize;
        let n = self.inner.read(&mut buf[..max_read])?;
        self.remaining -= n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_full_read() {
        let data = b"Hello, World!";
        let mut decoder = CopyDecoder::new(Cursor::new(data.to_vec()), data.len() as u64);

        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_stops_at_declared_size() {
        let data = b"Hello, World!";
        let mut decoder = CopyDecoder::new(Cursor::new(data.to_vec()), 5);

        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"Hello");
    }

    #[test]
    fn test_empty() {
        let mut decoder = CopyDecoder::new(Cursor::new(Vec::<u8>::new()), 0);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        assert!(out.is_empty());
    }
}
