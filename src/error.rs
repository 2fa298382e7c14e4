//! Error types for 7z archive reading.
//!
//! All fallible operations in this crate return [`Result<T>`], an alias for
//! `std::result::Result<T, Error>`. The [`Error`] enum covers every failure
//! mode of the reader, from malformed header structures to checksum
//! mismatches discovered at sub-stream boundaries.
//!
//! The first error surfaced from [`Reader::next_entry`] or a read is cached
//! and replayed on every subsequent call; the reader becomes inert. The only
//! permitted recovery is the ignore-checksum option at open time, which
//! downgrades signature-header and header CRC mismatches to warnings.
//!
//! [`Reader::next_entry`]: crate::Reader::next_entry

use std::io;

/// The error type for 7z archive reading operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred while reading from the underlying source.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The 32-byte signature header is malformed: bad magic bytes or an
    /// out-of-range next-header size.
    #[error("invalid signature header")]
    InvalidSignatureHeader,

    /// A CRC-32 check failed.
    ///
    /// Raised for the signature header, the next header, and at every
    /// sub-stream boundary during extraction. Only the first two can be
    /// downgraded with [`ReaderOptions::ignore_checksum`]; mismatches on
    /// file bodies are always fatal.
    ///
    /// [`ReaderOptions::ignore_checksum`]: crate::ReaderOptions::ignore_checksum
    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        /// The CRC-32 declared in the archive.
        expected: u32,
        /// The CRC-32 computed over the actual bytes.
        actual: u32,
    },

    /// A property tag was read that is unexpected at its position, unknown,
    /// or reserved by the format.
    #[error("unexpected property id")]
    UnexpectedPropertyId,

    /// A variable-length integer exceeded the signed 31-bit range while
    /// being narrowed to a count.
    #[error("invalid number")]
    InvalidNumber,

    /// The declared file count exceeds what the remaining header bytes
    /// could possibly describe.
    #[error("invalid file count")]
    InvalidFileCount,

    /// The folder count is out of range, or a folder declares an invalid
    /// number of coders.
    #[error("invalid folder count")]
    InvalidFolderCount,

    /// A coder declares an input or output stream count outside `1..=4`,
    /// or the header's stream accounting is inconsistent.
    #[error("invalid in/out stream count")]
    InvalidStreamCount,

    /// A coder property blob has a length outside `1..=128`.
    #[error("invalid property data size")]
    InvalidPropertyDataSize,

    /// A folder declares more than 4 packed streams.
    #[error("invalid packed streams count")]
    InvalidPackedStreamsCount,

    /// Per-packed-stream CRCs were encountered; the format defines them but
    /// this reader does not implement them.
    #[error("packinfo crcs are not implemented")]
    PackInfoCrcsNotImplemented,

    /// The archive uses additional streams or one of the external-data
    /// modes that rely on them.
    #[error("additional streams are not implemented")]
    AdditionalStreamsNotImplemented,

    /// The archive carries an archive-properties structure.
    #[error("archive properties are not implemented")]
    ArchivePropertiesNotImplemented,

    /// The archive requires a capability outside this reader's scope, such
    /// as an unresolvable codec graph or a nested encoded header.
    #[error("not supported: {0}")]
    NotSupported(&'static str),

    /// No decompressor is registered for a coder id.
    #[error("decompressor not found: {method:#x}")]
    DecompressorNotFound {
        /// The coder id with no registered decompressor.
        method: u64,
    },

    /// The source ended before a declared structure or sub-stream was
    /// complete.
    #[error("unexpected end of stream")]
    UnexpectedEof,
}

/// A specialized `Result` type for 7z reading operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Maps an I/O error from a structure read, where running out of bytes
    /// means the archive itself is truncated.
    pub(crate) fn from_read(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::UnexpectedEof
        } else {
            Error::Io(e)
        }
    }

    /// Returns `true` if this error indicates corrupt archive data rather
    /// than an environmental failure.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::InvalidSignatureHeader
                | Error::ChecksumMismatch { .. }
                | Error::UnexpectedPropertyId
                | Error::InvalidNumber
                | Error::UnexpectedEof
        )
    }
}

// The reader caches the first error and replays it on every subsequent
// call. `io::Error` is not `Clone`, so the replayed copy re-materialises it
// from its kind and message.
impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Error::Io(e) => Error::Io(io::Error::new(e.kind(), e.to_string())),
            Error::InvalidSignatureHeader => Error::InvalidSignatureHeader,
            Error::ChecksumMismatch { expected, actual } => Error::ChecksumMismatch {
                expected: *expected,
                actual: *actual,
            },
            Error::UnexpectedPropertyId => Error::UnexpectedPropertyId,
            Error::InvalidNumber => Error::InvalidNumber,
            Error::InvalidFileCount => Error::InvalidFileCount,
            Error::InvalidFolderCount => Error::InvalidFolderCount,
            Error::InvalidStreamCount => Error::InvalidStreamCount,
            Error::InvalidPropertyDataSize => Error::InvalidPropertyDataSize,
            Error::InvalidPackedStreamsCount => Error::InvalidPackedStreamsCount,
            Error::PackInfoCrcsNotImplemented => Error::PackInfoCrcsNotImplemented,
            Error::AdditionalStreamsNotImplemented => Error::AdditionalStreamsNotImplemented,
            Error::ArchivePropertiesNotImplemented => Error::ArchivePropertiesNotImplemented,
            Error::NotSupported(what) => Error::NotSupported(what),
            Error::DecompressorNotFound { method } => {
                Error::DecompressorNotFound { method: *method }
            }
            Error::UnexpectedEof => Error::UnexpectedEof,
        }
    }
}
