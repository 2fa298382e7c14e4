//! Process-wide freelist of input buffers.
//!
//! Each packed-stream view buffers its reads; the buffers are a fixed
//! nominal size and are recycled across folders instead of reallocated.

use std::sync::{Mutex, OnceLock};

/// Nominal size of a pooled input buffer.
pub(crate) const INPUT_BUFFER_SIZE: usize = 32 * 1024;

/// Upper bound on idle buffers kept in the pool.
const MAX_POOLED: usize = 16;

fn freelist() -> &'static Mutex<Vec<Vec<u8>>> {
    static FREELIST: OnceLock<Mutex<Vec<Vec<u8>>>> = OnceLock::new();
    FREELIST.get_or_init(|| Mutex::new(Vec::new()))
}

/// Takes a buffer from the pool, allocating one if the pool is empty.
pub(crate) fn acquire() -> Vec<u8> {
    let mut pool = freelist()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    pool.pop().unwrap_or_else(|| vec![0u8; INPUT_BUFFER_SIZE])
}

/// Returns a buffer to the pool.
pub(crate) fn release(buf: Vec<u8>) {
    if buf.len() != INPUT_BUFFER_SIZE {
        return;
    }
    let mut pool = freelist()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if pool.len() < MAX_POOLED {
        pool.push(buf);
    }
}
