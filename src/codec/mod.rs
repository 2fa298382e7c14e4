//! Decompressor infrastructure: built-in coders and the extension registry.
//!
//! Built-in coders dispatch through a static match on the coder id; ids
//! outside the built-in set fall through to a process-wide extension table
//! populated by [`register_decompressor`].

mod copy;

#[cfg(feature = "lzma")]
mod filters;

#[cfg(feature = "lzma")]
mod lzma;

#[cfg(feature = "deflate")]
mod deflate;

#[cfg(feature = "bzip2")]
mod bzip2;

pub mod bcj2;

use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, OnceLock, RwLock};

use crate::read::ReaderOptions;
use crate::{Error, Result};

pub use copy::CopyDecoder;

#[cfg(feature = "lzma")]
pub use filters::DeltaDecoder;

#[cfg(feature = "lzma")]
pub use lzma::{Lzma2Decoder, LzmaDecoder};

#[cfg(feature = "deflate")]
pub use deflate::DeflateDecoder;

#[cfg(feature = "bzip2")]
pub use bzip2::Bzip2Decoder;

pub use bcj2::Bcj2Decoder;

/// A byte stream feeding or produced by a coder.
pub type ByteStream = Box<dyn Read + Send>;

/// A decompressor factory.
///
/// Invoked with the coder's bound input streams, its property blob, the
/// declared unpack size of its output, and the reader options (for
/// password access). Returns the coder's output stream.
pub type Decompressor = Arc<
    dyn Fn(Vec<ByteStream>, &[u8], u64, &ReaderOptions) -> Result<ByteStream> + Send + Sync,
>;

/// Coder ids for the supported methods.
pub mod method {
    /// Copy (no compression).
    pub const COPY: u64 = 0x00;
    /// Delta filter.
    pub const DELTA: u64 = 0x03;
    /// LZMA.
    pub const LZMA: u64 = 0x03_01_01;
    /// LZMA2.
    pub const LZMA2: u64 = 0x21;
    /// BCJ2 (4-stream x86) filter.
    pub const BCJ2: u64 = 0x03_03_01_1B;
    /// Deflate.
    pub const DEFLATE: u64 = 0x04_01_08;
    /// BZip2.
    pub const BZIP2: u64 = 0x04_02_02;
    /// AES-256-CBC with SHA-256 key derivation.
    pub const AES_256_SHA_256: u64 = 0x06_F1_07_01;

    /// Returns a human-readable name for a coder id.
    pub fn name(method: u64) -> &'static str {
        match method {
            COPY => "Copy",
            DELTA => "Delta",
            LZMA => "LZMA",
            LZMA2 => "LZMA2",
            BCJ2 => "BCJ2",
            DEFLATE => "Deflate",
            BZIP2 => "BZip2",
            AES_256_SHA_256 => "AES-256-CBC",
            _ => "Unknown",
        }
    }
}

fn extensions() -> &'static RwLock<HashMap<u64, Decompressor>> {
    static EXTENSIONS: OnceLock<RwLock<HashMap<u64, Decompressor>>> = OnceLock::new();
    EXTENSIONS.get_or_init(|| RwLock::new(HashMap::new()))
}

fn lock_read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Registers an external decompressor for a coder id.
///
/// Registration is meant for initialisation time. Lookups afterwards are
/// read-only and safe for concurrent readers.
///
/// # Panics
///
/// Panics if the id is already taken, either by a built-in coder or by a
/// previous registration; a duplicate registration is a programming error.
pub fn register_decompressor(method: u64, decompressor: Decompressor) {
    if is_builtin(method) {
        panic!("decompressor {method:#x} already registered");
    }
    let mut table = extensions()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if table.insert(method, decompressor).is_some() {
        panic!("decompressor {method:#x} already registered");
    }
}

/// Returns `true` if the coder id is handled by a built-in decoder.
fn is_builtin(method: u64) -> bool {
    match method {
        method::COPY | method::BCJ2 => true,
        #[cfg(feature = "lzma")]
        method::DELTA | method::LZMA | method::LZMA2 => true,
        #[cfg(feature = "deflate")]
        method::DEFLATE => true,
        #[cfg(feature = "bzip2")]
        method::BZIP2 => true,
        #[cfg(feature = "aes")]
        method::AES_256_SHA_256 => true,
        _ => false,
    }
}

/// Returns `true` if a decoder exists for the coder id, built-in or
/// registered.
pub(crate) fn is_known(method: u64) -> bool {
    is_builtin(method) || lock_read(extensions()).contains_key(&method)
}

fn single(mut inputs: Vec<ByteStream>) -> Result<ByteStream> {
    if inputs.len() != 1 {
        return Err(Error::NotSupported("coder input count"));
    }
    inputs.pop().ok_or(Error::NotSupported("coder input count"))
}

/// Instantiates the decoder for a coder.
///
/// # Arguments
///
/// * `method` - The coder id from the folder declaration
/// * `inputs` - The coder's bound input streams, in slot order
/// * `properties` - The coder's property blob
/// * `unpack_size` - Declared size of the coder's output stream
/// * `options` - Reader options, consulted for the password
///
/// # Errors
///
/// [`Error::DecompressorNotFound`] if no decoder exists for the id;
/// otherwise whatever the decoder's constructor reports.
pub(crate) fn build_decoder(
    method: u64,
    inputs: Vec<ByteStream>,
    properties: &[u8],
    unpack_size: u64,
    options: &ReaderOptions,
) -> Result<ByteStream> {
    #[cfg(not(feature = "aes"))]
    let _ = options;

    match method {
        method::COPY => {
            let input = single(inputs)?;
            Ok(Box::new(CopyDecoder::new(input, unpack_size)))
        }

        #[cfg(feature = "lzma")]
        method::DELTA => {
            if properties.len() != 1 {
                return Err(Error::InvalidPropertyDataSize);
            }
            let input = single(inputs)?;
            Ok(Box::new(DeltaDecoder::new(input, properties)))
        }

        #[cfg(feature = "lzma")]
        method::LZMA => {
            let input = single(inputs)?;
            Ok(Box::new(LzmaDecoder::new(input, properties, unpack_size)?))
        }

        #[cfg(feature = "lzma")]
        method::LZMA2 => {
            let input = single(inputs)?;
            Ok(Box::new(Lzma2Decoder::new(input, properties)?))
        }

        method::BCJ2 => {
            if inputs.len() != 4 {
                return Err(Error::NotSupported("coder input count"));
            }
            let mut inputs = inputs.into_iter();
            let main = inputs.next().ok_or(Error::NotSupported("coder input count"))?;
            let call = inputs.next().ok_or(Error::NotSupported("coder input count"))?;
            let jump = inputs.next().ok_or(Error::NotSupported("coder input count"))?;
            let range = inputs.next().ok_or(Error::NotSupported("coder input count"))?;
            Ok(Box::new(Bcj2Decoder::new(main, call, jump, range)?))
        }

        #[cfg(feature = "deflate")]
        method::DEFLATE => {
            let input = single(inputs)?;
            Ok(Box::new(DeflateDecoder::new(std::io::BufReader::new(
                input,
            ))))
        }

        #[cfg(feature = "bzip2")]
        method::BZIP2 => {
            let input = single(inputs)?;
            Ok(Box::new(Bzip2Decoder::new(input)))
        }

        #[cfg(feature = "aes")]
        method::AES_256_SHA_256 => {
            let input = single(inputs)?;
            let password = crate::crypto::Password::new(options.resolved_password());
            Ok(Box::new(crate::crypto::Aes256Decoder::new(
                input, properties, &password,
            )?))
        }

        _ => {
            let registered = lock_read(extensions()).get(&method).cloned();
            match registered {
                Some(decompressor) => decompressor(inputs, properties, unpack_size, options),
                None => Err(Error::DecompressorNotFound { method }),
            }
        }
    }
}
