//! LZMA and LZMA2 decoders.

use std::io::{self, Read};

use crate::{Error, Result};

/// LZMA decoder.
pub struct LzmaDecoder<R> {
    inner: lzma_rust2::LzmaReader<R>,
}

impl<R> std::fmt::Debug for LzmaDecoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LzmaDecoder").finish_non_exhaustive()
    }
}

impl<R: Read> LzmaDecoder<R> {
    /// Creates a new LZMA decoder.
    ///
    /// Properties are 5 bytes: one lc/lp/pb byte plus a 4-byte
    /// little-endian dictionary size.
    pub fn new(input: R, properties: &[u8], unpack_size: u64) -> Result<Self> {
        if properties.len() < 5 {
            return Err(Error::InvalidPropertyDataSize);
        }

        let props_byte = properties[0];
        let dict_size = u32::from_le_bytes(properties[1..5].try_into().expect("4 bytes"));

        let reader =
            lzma_rust2::LzmaReader::new_with_props(input, unpack_size, props_byte, dict_size, None)
                .map_err(|e| {
                    Error::Io(io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
                })?;

        Ok(Self { inner: reader })
    }
}

impl<R: Read> Read for LzmaDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// LZMA2 decoder.
pub struct Lzma2Decoder<R> {
    inner: lzma_rust2::Lzma2Reader<R>,
}

impl<R> std::fmt::Debug for Lzma2Decoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lzma2Decoder").finish_non_exhaustive()
    }
}

impl<R: Read> Lzma2Decoder<R> {
    /// Creates a new LZMA2 decoder.
    ///
    /// The single property byte encodes the dictionary size.
    pub fn new(input: R, properties: &[u8]) -> Result<Self> {
        let Some(&dict_byte) = properties.first() else {
            return Err(Error::InvalidPropertyDataSize);
        };
        let dict_size = decode_dict_size(dict_byte)?;

        Ok(Self {
            inner: lzma_rust2::Lzma2Reader::new(input, dict_size, None),
        })
    }
}

impl<R: Read> Read for Lzma2Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Decodes the LZMA2 dictionary-size property byte.
///
/// Values 0..40 encode `(2 | (bits & 1)) << (bits / 2 + 11)`; 40 means the
/// 4 GiB maximum.
fn decode_dict_size(bits: u8) -> Result<u32> {
    match bits {
        0..=39 => Ok((2 | (bits as u32 & 1)) << (bits / 2 + 11)),
        40 => Ok(u32::MAX),
        _ => Err(Error::InvalidPropertyDataSize),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_dict_size_decoding() {
        assert_eq!(decode_dict_size(0).unwrap(), 4096);
        assert_eq!(decode_dict_size(1).unwrap(), 6144);
        assert_eq!(decode_dict_size(2).unwrap(), 8192);
        assert_eq!(decode_dict_size(40).unwrap(), u32::MAX);
        assert!(decode_dict_size(41).is_err());
    }

    #[test]
    fn test_lzma_requires_five_property_bytes() {
        let result = LzmaDecoder::new(Cursor::new(Vec::new()), &[0x5D], 0);
        assert!(matches!(result, Err(Error::InvalidPropertyDataSize)));
    }

    #[test]
    fn test_lzma_decoder_construction() {
        // lc=3 lp=0 pb=2 with a 1 MiB dictionary.
        let properties = [0x5D, 0x00, 0x00, 0x10, 0x00];
        assert!(LzmaDecoder::new(Cursor::new(Vec::new()), &properties, 0).is_ok());
    }

    #[test]
    fn test_lzma2_requires_properties() {
        let result = Lzma2Decoder::new(Cursor::new(Vec::new()), &[]);
        assert!(matches!(result, Err(Error::InvalidPropertyDataSize)));
    }

    #[test]
    fn test_lzma2_decoder_construction() {
        assert!(Lzma2Decoder::new(Cursor::new(Vec::new()), &[0x18]).is_ok());
    }
}
