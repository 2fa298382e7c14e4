//! Signature header parsing.

use std::io::Read;

use crate::checksum::Crc32;
use crate::{Error, Result};

use super::{MAX_HEADER_SIZE, SIGNATURE, SIGNATURE_HEADER_SIZE};

/// The fixed 32-byte structure at the top of every 7z file.
///
/// It locates the next header (the real metadata), which sits after the
/// packed stream data, and carries CRCs over both itself and the next
/// header's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Archive format version - major number.
    pub version_major: u8,
    /// Archive format version - minor number.
    pub version_minor: u8,
    /// Offset from the end of the signature header to the next header.
    pub next_header_offset: u64,
    /// Size of the next header in bytes.
    pub next_header_size: u64,
    /// CRC of the next header bytes.
    pub next_header_crc: u32,
}

impl SignatureHeader {
    /// Parses the signature header from a reader.
    ///
    /// With `ignore_checksum` set, a CRC mismatch over the start-header
    /// bytes is downgraded to a warning and parsing continues with the
    /// values as read.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSignatureHeader`] if the magic bytes do not match
    ///   or the next-header size is out of range.
    /// - [`Error::ChecksumMismatch`] if the start-header CRC fails and
    ///   `ignore_checksum` is unset.
    /// - [`Error::UnexpectedEof`] if fewer than 32 bytes are available.
    pub fn parse<R: Read>(r: &mut R, ignore_checksum: bool) -> Result<Self> {
        let mut raw = [0u8; SIGNATURE_HEADER_SIZE as usize];
        r.read_exact(&mut raw).map_err(Error::from_read)?;

        if raw[..6] != SIGNATURE[..] {
            return Err(Error::InvalidSignatureHeader);
        }

        let start_header_crc = u32::from_le_bytes(raw[8..12].try_into().expect("4 bytes"));
        let next_header_offset = u64::from_le_bytes(raw[12..20].try_into().expect("8 bytes"));
        let next_header_size = u64::from_le_bytes(raw[20..28].try_into().expect("8 bytes"));
        let next_header_crc = u32::from_le_bytes(raw[28..32].try_into().expect("4 bytes"));

        if next_header_size > MAX_HEADER_SIZE {
            return Err(Error::InvalidSignatureHeader);
        }

        let actual = Crc32::compute(&raw[12..]);
        if actual != start_header_crc {
            if !ignore_checksum {
                return Err(Error::ChecksumMismatch {
                    expected: start_header_crc,
                    actual,
                });
            }
            log::warn!(
                "ignoring signature header CRC mismatch (expected {:#010x}, got {:#010x})",
                start_header_crc,
                actual
            );
        }

        Ok(Self {
            version_major: raw[6],
            version_minor: raw[7],
            next_header_offset,
            next_header_size,
            next_header_crc,
        })
    }

    /// Returns the absolute byte position where the next header starts.
    pub fn next_header_position(&self) -> u64 {
        SIGNATURE_HEADER_SIZE + self.next_header_offset
    }
}
