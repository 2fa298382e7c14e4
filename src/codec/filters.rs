//! Delta filter decoder.
//!
//! Delta is a pre-processing filter that stores byte differences at a
//! fixed distance; it improves compression of regularly strided data such
//! as audio samples. Decoding reverses the subtraction.

use std::io::{self, Read};

use lzma_rust2::filter::delta::DeltaReader;

/// Delta filter decoder.
pub struct DeltaDecoder<R> {
    inner: DeltaReader<R>,
}

impl<R> std::fmt::Debug for DeltaDecoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeltaDecoder").finish_non_exhaustive()
    }
}

impl<R: Read> DeltaDecoder<R> {
    /// Creates a new Delta filter decoder.
    ///
    /// The single property byte stores `distance - 1`, so byte 0 means
    /// distance 1.
    pub fn new(input: R, properties: &[u8]) -> Self {
        let distance = properties.first().map(|b| *b as usize + 1).unwrap_or(1);
        Self {
            inner: DeltaReader::new(input, distance),
        }
    }
}

impl<R: Read> Read for DeltaDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}
