//! Reader configuration.

#[cfg(feature = "aes")]
use std::sync::OnceLock;

/// A callback that supplies the archive password on demand.
///
/// Invoked at most once, the first time a coder needs the password.
#[cfg(feature = "aes")]
pub type PasswordCallback = Box<dyn Fn() -> String + Send + Sync>;

/// Options controlling how an archive is opened and read.
///
/// # Example
///
/// ```rust,no_run
/// use sevenstream::{Reader, ReaderOptions};
///
/// let options = ReaderOptions::new()
///     .password("secret")
///     .ignore_checksum(false);
/// let reader = Reader::open_path_with_options("archive.7z", options)?;
/// # Ok::<(), sevenstream::Error>(())
/// ```
#[derive(Default)]
pub struct ReaderOptions {
    #[cfg(feature = "aes")]
    password: Option<String>,
    #[cfg(feature = "aes")]
    password_callback: Option<PasswordCallback>,
    #[cfg(feature = "aes")]
    resolved: OnceLock<String>,
    ignore_checksum: bool,
}

impl std::fmt::Debug for ReaderOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("ReaderOptions");
        s.field("ignore_checksum", &self.ignore_checksum);
        #[cfg(feature = "aes")]
        {
            s.field("password", &self.password.as_ref().map(|_| "***"));
            s.field("password_callback", &self.password_callback.is_some());
        }
        s.finish()
    }
}

impl ReaderOptions {
    /// Creates options with defaults: no password, checksums enforced.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the archive password.
    ///
    /// Takes precedence over [`password_callback`](Self::password_callback).
    #[cfg(feature = "aes")]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets a callback that supplies the password the first time it is
    /// needed, for example by prompting.
    #[cfg(feature = "aes")]
    pub fn password_callback(mut self, callback: PasswordCallback) -> Self {
        self.password_callback = Some(callback);
        self
    }

    /// Downgrades signature-header and header CRC mismatches to warnings.
    ///
    /// Checksum failures on file bodies stay fatal regardless.
    pub fn ignore_checksum(mut self, ignore: bool) -> Self {
        self.ignore_checksum = ignore;
        self
    }

    /// Returns the password, resolving the callback on first use.
    ///
    /// An unset password resolves to the empty string; a wrong or absent
    /// password surfaces later as a checksum mismatch.
    #[cfg(feature = "aes")]
    pub fn resolved_password(&self) -> &str {
        self.resolved.get_or_init(|| {
            if let Some(password) = &self.password {
                password.clone()
            } else if let Some(callback) = &self.password_callback {
                callback()
            } else {
                String::new()
            }
        })
    }

    pub(crate) fn ignores_checksum(&self) -> bool {
        self.ignore_checksum
    }
}
