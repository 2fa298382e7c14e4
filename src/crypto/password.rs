//! Password handling for encrypted archives.

/// An archive password.
///
/// 7z hashes passwords as UTF-16LE regardless of the platform encoding;
/// [`Password::as_utf16_le`] produces exactly the byte sequence the key
/// derivation consumes. The `Debug` impl never prints the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    /// Creates a password from a string.
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    /// Creates the empty password used for unencrypted reads.
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Returns the password as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the password is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the password encoded as UTF-16LE bytes.
    pub fn as_utf16_le(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.0.len() * 2);
        for unit in self.0.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(***)")
    }
}

impl From<&str> for Password {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
