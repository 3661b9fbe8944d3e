//! Backup medium errors

use std::io;

use thiserror::Error;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Failures reported by a backup medium.
///
/// The reconciliation engine absorbs every one of these; none aborts a check.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Medium absent, unmounted, or nothing stored yet
    #[error("backup medium unavailable: {0}")]
    Unavailable(String),

    /// Read or write failed part way
    #[error("backup medium I/O error during {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    /// Stored object is not exactly one record long
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    /// Configured location does not fit inside the medium
    #[error("record at offset {offset} ({len} bytes) exceeds medium capacity {capacity}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize,
    },
}

impl BackendError {
    pub fn io(context: &'static str, source: io::Error) -> Self {
        BackendError::Io { context, source }
    }

    /// Returns true when the medium is simply not there, as opposed to failing.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            BackendError::Unavailable(_) | BackendError::OutOfBounds { .. }
        )
    }
}
