//! AES-256-CBC decryption for encrypted 7z streams.
//!
//! The 7z encryption scheme derives a 256-bit key from the password with
//! an iterated SHA-256 (or a legacy no-stretch concatenation), then
//! encrypts stream data with AES-256 in CBC mode. Key derivation is
//! expensive, so derived keys are cached process-wide: an archive commonly
//! reuses one password/salt pair across many coders.

mod password;

use std::collections::HashMap;
use std::io::{self, Read};
use std::sync::{Mutex, OnceLock};

use aes::Aes256;
use cbc::cipher::{BlockDecryptMut, KeyIvInit};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

pub use password::Password;

type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// AES block size in bytes.
const BLOCK_SIZE: usize = 16;

/// The `num_cycles_power` value meaning "no key stretch".
const NO_STRETCH: u8 = 0x3F;

/// Maximum accepted `num_cycles_power` for stretched keys.
///
/// 2^30 iterations already takes seconds; anything higher is a
/// denial-of-service vector, not a real archive.
pub const MAX_NUM_CYCLES_POWER: u8 = 30;

/// Coder properties for the AES-256-CBC coder.
///
/// Layout: the first byte packs `num_cycles_power` (low 6 bits) and the
/// high bits of the salt/IV sizes; the second byte carries the remaining
/// size nibbles; salt bytes then IV bytes follow.
#[derive(Debug, Clone)]
pub struct AesProperties {
    /// Key stretch exponent; [`NO_STRETCH`] disables stretching.
    pub num_cycles_power: u8,
    /// Salt (0-16 bytes).
    pub salt: Vec<u8>,
    /// Initialisation vector (0-16 bytes).
    pub iv: Vec<u8>,
}

impl AesProperties {
    /// Parses the AES coder property blob.
    pub fn parse(properties: &[u8]) -> Result<Self> {
        if properties.len() < 2 {
            return Err(Error::NotSupported("aes coder properties"));
        }

        let b0 = properties[0];
        let b1 = properties[1];

        let salt_size = (((b0 >> 7) & 1) + (b1 >> 4)) as usize;
        let iv_size = (((b0 >> 6) & 1) + (b1 & 0x0F)) as usize;
        let num_cycles_power = b0 & 0x3F;

        let rest = &properties[2..];
        if rest.len() < salt_size + iv_size {
            return Err(Error::NotSupported("aes coder properties"));
        }

        Ok(Self {
            num_cycles_power,
            salt: rest[..salt_size].to_vec(),
            iv: rest[salt_size..salt_size + iv_size].to_vec(),
        })
    }
}

/// Derives the 256-bit AES key for a password/salt/power tuple.
///
/// With `num_cycles_power == 0x3F` no stretching is applied: the key is
/// salt followed by the UTF-16LE password, zero-padded to 16 bytes. The
/// format is ambiguous about the key width in that mode; AES-256 needs 32
/// bytes, so the 16-byte buffer is zero-extended.
///
/// Otherwise SHA-256 is fed `salt ‖ password ‖ counter` for `2^power`
/// rounds, with a little-endian 64-bit counter incremented each round; the
/// final digest is the key.
pub fn derive_key(password: &Password, salt: &[u8], num_cycles_power: u8) -> Result<[u8; 32]> {
    let password_bytes = password.as_utf16_le();

    if num_cycles_power == NO_STRETCH {
        let mut key = [0u8; 32];
        let mut pos = 0;
        for &b in salt.iter().take(BLOCK_SIZE) {
            key[pos] = b;
            pos += 1;
        }
        for &b in password_bytes.iter() {
            if pos >= BLOCK_SIZE {
                break;
            }
            key[pos] = b;
            pos += 1;
        }
        return Ok(key);
    }

    if num_cycles_power > MAX_NUM_CYCLES_POWER {
        log::warn!(
            "rejecting aes key derivation with cycles power {}",
            num_cycles_power
        );
        return Err(Error::NotSupported("aes key derivation cost"));
    }

    let mut sha = Sha256::new();
    let mut counter = [0u8; 8];
    for _ in 0..1u64 << num_cycles_power {
        sha.update(salt);
        sha.update(&password_bytes);
        sha.update(counter);

        for byte in counter.iter_mut() {
            *byte = byte.wrapping_add(1);
            if *byte != 0 {
                break;
            }
        }
    }

    Ok(sha.finalize().into())
}

/// Cache key: hashed password (never the plaintext), salt, and power.
#[derive(PartialEq, Eq, Hash)]
struct CacheKey {
    password_hash: [u8; 32],
    salt: Vec<u8>,
    num_cycles_power: u8,
}

fn key_cache() -> &'static Mutex<HashMap<CacheKey, [u8; 32]>> {
    static CACHE: OnceLock<Mutex<HashMap<CacheKey, [u8; 32]>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Derives a key through the process-wide cache.
pub(crate) fn cached_key(
    password: &Password,
    salt: &[u8],
    num_cycles_power: u8,
) -> Result<[u8; 32]> {
    let cache_key = CacheKey {
        password_hash: Sha256::digest(password.as_utf16_le()).into(),
        salt: salt.to_vec(),
        num_cycles_power,
    };

    // Cached keys are deterministically derivable, so a poisoned lock is
    // recoverable.
    let mut cache = key_cache()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(&key) = cache.get(&cache_key) {
        return Ok(key);
    }

    let key = derive_key(password, salt, num_cycles_power)?;
    cache.insert(cache_key, key);
    Ok(key)
}

/// Streaming AES-256-CBC decoder.
pub struct Aes256Decoder<R> {
    inner: R,
    buffer: Vec<u8>,
    pos: usize,
    key: [u8; 32],
    iv: [u8; 16],
    finished: bool,
}

impl<R> std::fmt::Debug for Aes256Decoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aes256Decoder").finish_non_exhaustive()
    }
}

impl<R: Read> Aes256Decoder<R> {
    /// Creates a decoder from the coder's property blob and a password.
    pub fn new(input: R, properties: &[u8], password: &Password) -> Result<Self> {
        let props = AesProperties::parse(properties)?;
        let key = cached_key(password, &props.salt, props.num_cycles_power)?;

        let mut iv = [0u8; 16];
        let iv_len = props.iv.len().min(16);
        iv[..iv_len].copy_from_slice(&props.iv[..iv_len]);

        Ok(Self::with_key_iv(input, key, iv))
    }

    /// Creates a decoder with an explicit key and IV.
    pub fn with_key_iv(input: R, key: [u8; 32], iv: [u8; 16]) -> Self {
        Self {
            inner: input,
            buffer: Vec::new(),
            pos: 0,
            key,
            iv,
            finished: false,
        }
    }

    fn decrypt_chunk(&mut self) -> io::Result<()> {
        let mut encrypted = vec![0u8; 4096];
        let n = read_full(&mut self.inner, &mut encrypted)?;

        if n == 0 {
            self.finished = true;
            return Ok(());
        }
        if n % BLOCK_SIZE != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "encrypted data not block-aligned",
            ));
        }
        encrypted.truncate(n);

        // CBC chains on the last ciphertext block; grab it before
        // decrypting in place.
        let next_iv: [u8; 16] = encrypted[n - BLOCK_SIZE..]
            .try_into()
            .expect("slice is exactly one block");

        let decryptor = Aes256CbcDec::new(&self.key.into(), &self.iv.into());
        let decrypted = decryptor
            .decrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut encrypted)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

        self.iv = next_iv;
        self.buffer = decrypted.to_vec();
        self.pos = 0;

        Ok(())
    }
}

/// Reads until the buffer is full or the source is exhausted.
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

impl<R: Read> Read for Aes256Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.buffer.len() && !self.finished {
            self.decrypt_chunk()?;
        }
        if self.pos >= self.buffer.len() {
            return Ok(0);
        }

        let available = &self.buffer[self.pos..];
        let to_copy = available.len().min(buf.len());
        buf[..to_copy].copy_from_slice(&available[..to_copy]);
        self.pos += to_copy;

        Ok(to_copy)
    }
}
