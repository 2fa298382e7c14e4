//! The sub-stream sequencer over a folder's decoded output.

use crate::checksum::Crc32;
use crate::codec::ByteStream;
use crate::{Error, READ_BUFFER_SIZE, Result};

/// Sequences a folder's single decoded stream into its sub-streams.
///
/// A solid block carries the concatenation of one or more files. The
/// sequencer enforces each sub-stream's declared size, keeps a running
/// CRC-32 across reads, and verifies it against the declared digest
/// exactly at the sub-stream boundary. This is the only place file bodies
/// are checksummed.
pub struct SolidBlock {
    sink: ByteStream,
    sizes: Vec<u64>,
    /// Declared CRC per sub-stream; 0 means no check.
    crcs: Vec<u32>,
    /// Index of the current sub-stream; `None` before the first
    /// [`next`](Self::next).
    index: Option<usize>,
    remaining: u64,
    digest: Crc32,
    /// A mismatch found at a boundary, held back so the bytes read in the
    /// same call are not lost.
    pending: Option<Error>,
}

impl SolidBlock {
    /// Creates a sequencer over a folder's sink stream.
    ///
    /// `sizes` and `crcs` are parallel arrays, one entry per sub-stream.
    pub fn new(sink: ByteStream, sizes: Vec<u64>, crcs: Vec<u32>) -> Self {
        Self {
            sink,
            sizes,
            crcs,
            index: None,
            remaining: 0,
            digest: Crc32::new(),
            pending: None,
        }
    }

    /// Advances to the next sub-stream.
    ///
    /// Any unread remainder of the current sub-stream is drained first,
    /// with CRC accounting intact, so skipping a file still verifies it.
    /// Returns `false` when no sub-streams remain.
    pub fn next(&mut self) -> Result<bool> {
        if self.index.is_some() {
            let mut scratch = [0u8; READ_BUFFER_SIZE];
            while self.remaining > 0 {
                self.read(&mut scratch)?;
            }
        }
        if let Some(err) = self.pending.take() {
            return Err(err);
        }

        let next = self.index.map_or(0, |i| i + 1);
        if next >= self.sizes.len() {
            self.index = Some(next);
            return Ok(false);
        }

        self.index = Some(next);
        self.remaining = self.sizes[next];
        self.digest.reset();
        Ok(true)
    }

    /// Reads up to `buf.len()` bytes from the current sub-stream.
    ///
    /// Returns 0 once the sub-stream is exhausted, until [`next`] moves
    /// on. A checksum mismatch discovered at the boundary is reported on
    /// the first call after the final bytes were handed out.
    ///
    /// [`next`]: Self::next
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.remaining == 0 {
            if let Some(err) = self.pending.take() {
                return Err(err);
            }
            return Ok(0);
        }

        let want = self.remaining.min(buf.len() as u64) as usize;
        if want == 0 {
            return Ok(0);
        }

        let n = self.sink.read(&mut buf[..want]).map_err(Error::from_read)?;
        if n == 0 {
            // The graph ended before the declared sub-stream size.
            return Err(Error::UnexpectedEof);
        }

        self.digest.update(&buf[..n]);
        self.remaining -= n as u64;

        if self.remaining == 0 {
            let expected = self.index.and_then(|i| self.crcs.get(i)).copied().unwrap_or(0);
            let actual = self.digest.finalize();
            if expected != 0 && expected != actual {
                self.pending = Some(Error::ChecksumMismatch { expected, actual });
            }
        }

        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn block(data: &[u8], sizes: Vec<u64>, crcs: Vec<u32>) -> SolidBlock {
        SolidBlock::new(Box::new(Cursor::new(data.to_vec())), sizes, crcs)
    }

    fn read_current(block: &mut SolidBlock) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut buf = [0u8; 7]; // odd size to exercise partial reads
        loop {
            let n = block.read(&mut buf)?;
            if n == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&buf[..n]);
        }
    }

    #[test]
    fn test_sequences_substreams() {
        let mut block = block(
            b"aaabbccccc",
            vec![3, 2, 5],
            vec![
                Crc32::compute(b"aaa"),
                Crc32::compute(b"bb"),
                Crc32::compute(b"ccccc"),
            ],
        );

        assert!(block.next().unwrap());
        assert_eq!(read_current(&mut block).unwrap(), b"aaa");
        assert!(block.next().unwrap());
        assert_eq!(read_current(&mut block).unwrap(), b"bb");
        assert!(block.next().unwrap());
        assert_eq!(read_current(&mut block).unwrap(), b"ccccc");
        assert!(!block.next().unwrap());
    }

    #[test]
    fn test_read_before_next_returns_nothing() {
        let mut block = block(b"abc", vec![3], vec![0]);
        let mut buf = [0u8; 8];
        assert_eq!(block.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_zero_crc_skips_verification() {
        let mut block = block(b"abc", vec![3], vec![0]);
        assert!(block.next().unwrap());
        assert_eq!(read_current(&mut block).unwrap(), b"abc");
        assert!(!block.next().unwrap());
    }

    #[test]
    fn test_mismatch_reported_at_boundary() {
        let mut block = block(b"abc", vec![3], vec![0x12345678]);
        assert!(block.next().unwrap());

        // The final bytes are still delivered; the mismatch follows.
        let mut buf = [0u8; 8];
        assert_eq!(block.read(&mut buf).unwrap(), 3);
        assert!(matches!(
            block.read(&mut buf),
            Err(Error::ChecksumMismatch { expected: 0x12345678, .. })
        ));
    }

    #[test]
    fn test_mismatch_surfaces_on_skip() {
        // Skipping a corrupt sub-stream without reading it still fails.
        let mut block = block(
            b"abcdef",
            vec![3, 3],
            vec![0xBADBAD, Crc32::compute(b"def")],
        );
        assert!(block.next().unwrap());
        assert!(matches!(
            block.next(),
            Err(Error::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_short_sink_is_eof() {
        let mut block = block(b"ab", vec![5], vec![0]);
        assert!(block.next().unwrap());
        assert!(matches!(read_current(&mut block), Err(Error::UnexpectedEof)));
    }

    #[test]
    fn test_empty_substream() {
        let mut block = block(b"x", vec![0, 1], vec![0, Crc32::compute(b"x")]);
        assert!(block.next().unwrap());
        assert_eq!(read_current(&mut block).unwrap(), b"");
        assert!(block.next().unwrap());
        assert_eq!(read_current(&mut block).unwrap(), b"x");
        assert!(!block.next().unwrap());
    }

    #[test]
    fn test_no_substreams() {
        let mut block = block(b"", vec![], vec![]);
        assert!(!block.next().unwrap());
        assert!(!block.next().unwrap());
    }
}
