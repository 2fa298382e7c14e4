//! 7z archive format constants, structures, and header parsing.
//!
//! This module contains the magic numbers, property ids, and structural
//! limits defined by the 7z archive format, together with the recursive
//! descent parser for archive headers.

pub mod files;
pub mod header;
pub mod parser;
pub mod reader;
pub mod streams;

/// The 7z file signature (magic bytes).
///
/// Every valid 7z archive starts with these 6 bytes: `'7' 'z' 0xBC 0xAF 0x27 0x1C`
pub const SIGNATURE: &[u8; 6] = &[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C];

/// Size of the signature header in bytes.
///
/// The signature header contains:
/// - 6 bytes: signature
/// - 2 bytes: version (major, minor)
/// - 4 bytes: start header CRC
/// - 8 bytes: next header offset
/// - 8 bytes: next header size
/// - 4 bytes: next header CRC
pub const SIGNATURE_HEADER_SIZE: u64 = 32;

/// Maximum accepted next-header size (4 EiB).
pub const MAX_HEADER_SIZE: u64 = 1 << 62;

/// Property ids used in 7z archive headers.
pub mod property_id {
    /// End of structure marker.
    pub const END: u8 = 0x00;
    /// Header marker.
    pub const HEADER: u8 = 0x01;
    /// Archive properties (rejected).
    pub const ARCHIVE_PROPERTIES: u8 = 0x02;
    /// Additional streams info (rejected).
    pub const ADDITIONAL_STREAMS_INFO: u8 = 0x03;
    /// Main streams info.
    pub const MAIN_STREAMS_INFO: u8 = 0x04;
    /// Files info.
    pub const FILES_INFO: u8 = 0x05;
    /// Pack info.
    pub const PACK_INFO: u8 = 0x06;
    /// Unpack info.
    pub const UNPACK_INFO: u8 = 0x07;
    /// Substreams info.
    pub const SUBSTREAMS_INFO: u8 = 0x08;
    /// Size vector.
    pub const SIZE: u8 = 0x09;
    /// CRC vector.
    pub const CRC: u8 = 0x0A;
    /// Folder definitions.
    pub const FOLDER: u8 = 0x0B;
    /// Per-coder unpack sizes.
    pub const CODERS_UNPACK_SIZE: u8 = 0x0C;
    /// Number of unpack streams per folder.
    pub const NUM_UNPACK_STREAM: u8 = 0x0D;
    /// Empty stream bit vector.
    pub const EMPTY_STREAM: u8 = 0x0E;
    /// Empty file bit vector.
    pub const EMPTY_FILE: u8 = 0x0F;
    /// Anti-file bit vector.
    pub const ANTI: u8 = 0x10;
    /// File names.
    pub const NAME: u8 = 0x11;
    /// Creation time.
    pub const CTIME: u8 = 0x12;
    /// Access time.
    pub const ATIME: u8 = 0x13;
    /// Modification time.
    pub const MTIME: u8 = 0x14;
    /// Windows file attributes.
    pub const WIN_ATTRIBUTES: u8 = 0x15;
    /// Encoded header marker.
    pub const ENCODED_HEADER: u8 = 0x17;
    /// Start position (rejected).
    pub const START_POS: u8 = 0x18;
    /// Padding; payload is skipped.
    pub const DUMMY: u8 = 0x19;
}

/// Structural limits enforced while parsing.
pub mod limits {
    /// Largest value a count may take when narrowed from a 7z number.
    pub const MAX_NUMBER: u64 = 0x7FFF_FFFF;

    /// Maximum number of folders in an archive.
    pub const MAX_FOLDER_COUNT: u64 = 1 << 30;

    /// Maximum number of coders in a folder.
    pub const MAX_CODERS_IN_FOLDER: usize = 4;

    /// Maximum input/output streams into/out of a single coder.
    pub const MAX_IN_OUT_STREAMS: usize = 4;

    /// Maximum number of packed streams feeding a folder.
    pub const MAX_PACKED_STREAMS_IN_FOLDER: usize = 4;

    /// Maximum size in bytes of a coder property blob.
    pub const MAX_PROPERTY_DATA_SIZE: usize = 128;

    /// Cap on the decoded size of an encoded header (64 MiB).
    pub const MAX_DECODED_HEADER_SIZE: u64 = 64 << 20;
}
