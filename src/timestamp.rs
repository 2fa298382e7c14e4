//! Timestamp conversion between Windows FILETIME and Unix time.
//!
//! 7z archives store timestamps as Windows FILETIME values: 100-nanosecond
//! intervals since 1601-01-01 UTC. The reader converts them to nanoseconds
//! since the Unix epoch when parsing file metadata.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Offset between the FILETIME epoch (1601-01-01) and the Unix epoch
/// (1970-01-01), in 100-nanosecond intervals.
const FILETIME_UNIX_DIFF: i64 = 116_444_736_000_000_000;

/// A point in time, stored as nanoseconds since the Unix epoch.
///
/// Values before 1970 are negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from a Windows FILETIME value.
    pub fn from_filetime(filetime: u64) -> Self {
        let intervals = (filetime as i64).wrapping_sub(FILETIME_UNIX_DIFF);
        Self(intervals.saturating_mul(100))
    }

    /// Creates a timestamp from nanoseconds since the Unix epoch.
    pub fn from_unix_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Returns the timestamp as nanoseconds since the Unix epoch.
    pub fn as_unix_nanos(&self) -> i64 {
        self.0
    }

    /// Converts the timestamp to a [`SystemTime`].
    pub fn to_system_time(&self) -> SystemTime {
        if self.0 >= 0 {
            UNIX_EPOCH + Duration::from_nanos(self.0 as u64)
        } else {
            UNIX_EPOCH - Duration::from_nanos(self.0.unsigned_abs())
        }
    }
}
