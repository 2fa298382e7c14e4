//! # sevenstream
//!
//! A streaming reader for 7z archives.
//!
//! The reader walks an archive's file list in declared order and exposes
//! each file's bytes through [`std::io::Read`], drawing from the
//! underlying random-access source on demand. Solid blocks are decoded
//! through a codec graph assembled from the archive's folder declarations;
//! per-file CRC-32 digests are verified as each sub-stream completes.
//!
//! ## Reading an archive
//!
//! ```rust,no_run
//! use std::io::Read;
//! use sevenstream::{Reader, Result};
//!
//! fn main() -> Result<()> {
//!     let mut reader = Reader::open_path("archive.7z")?;
//!
//!     while let Some(entry) = reader.next_entry()? {
//!         if entry.is_dir() {
//!             println!("{}/", entry.name);
//!             continue;
//!         }
//!         let mut body = Vec::new();
//!         reader.read_to_end(&mut body)?;
//!         println!("{}: {} bytes", entry.name, body.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Encrypted archives
//!
//! ```rust,no_run
//! # #[cfg(feature = "aes")]
//! # fn main() -> sevenstream::Result<()> {
//! use sevenstream::{Reader, ReaderOptions};
//!
//! let options = ReaderOptions::new().password("secret");
//! let reader = Reader::open_path_with_options("encrypted.7z", options)?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "aes"))]
//! # fn main() {}
//! ```
//!
//! ## Feature flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `lzma` | Yes | LZMA, LZMA2 and the Delta filter |
//! | `deflate` | Yes | Deflate decompression |
//! | `bzip2` | Yes | BZip2 decompression |
//! | `aes` | Yes | AES-256-CBC encrypted streams |
//!
//! Copy and BCJ2 are always available. Additional coders can be hooked in
//! with [`register_decompressor`].
//!
//! ## Scope
//!
//! This crate reads archives; it does not write or modify them. Entries
//! are strictly sequential — there is no seeking within a file body —
//! and multi-volume archives are out of scope.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

/// Default buffer size for internal read loops (8 KiB).
pub(crate) const READ_BUFFER_SIZE: usize = 8192;

pub mod checksum;
pub mod codec;
pub mod error;
pub mod format;
pub mod read;
pub mod solid;
pub mod timestamp;

#[cfg(feature = "aes")]
pub mod crypto;

pub use error::{Error, Result};
pub use format::files::FileInfo;
pub use read::{Reader, ReaderOptions};
pub use timestamp::Timestamp;

pub use codec::{Decompressor, register_decompressor};

#[cfg(feature = "aes")]
pub use crypto::Password;

#[cfg(feature = "aes")]
pub use read::PasswordCallback;
