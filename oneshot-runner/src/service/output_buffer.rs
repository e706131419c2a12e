//! Output buffer
//!
//! Accumulates the bytes a workload writes to one output channel (stdout,
//! stderr, or pod logs) for the whole lifetime of the workload.

use std::sync::{Arc, Mutex, PoisonError};

/// In-memory sink for one output channel
///
/// Each write is a synchronous append, so the order of writes is preserved.
/// Clones share the same underlying buffer. Bytes are decoded only when the
/// contents are read, which keeps multi-byte characters that were split
/// across writes intact.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl OutputBuffer {
    /// Creates a new empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk
    pub fn write(&self, chunk: &[u8]) {
        let mut bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        bytes.extend_from_slice(chunk);
    }

    /// Returns everything written so far as text
    ///
    /// Invalid UTF-8 sequences are replaced with U+FFFD.
    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Number of bytes written so far
    pub fn len(&self) -> usize {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
