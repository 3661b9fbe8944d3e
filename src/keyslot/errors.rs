//! Live key slot errors

use std::io;

use thiserror::Error;

/// Result type for live key slot access
pub type KeySlotResult<T> = Result<T, KeySlotError>;

#[derive(Debug, Error)]
pub enum KeySlotError {
    #[error("key slot I/O error during {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("key slot holds {actual} bytes, expected {expected}")]
    Length { expected: usize, actual: usize },

    #[error("key slot write rejected: {0}")]
    WriteRejected(String),
}

impl KeySlotError {
    pub fn io(context: &'static str, source: io::Error) -> Self {
        KeySlotError::Io { context, source }
    }
}
