//! Record codec errors

use thiserror::Error;

/// Result type for record encoding and decoding
pub type RecordResult<T> = Result<T, RecordError>;

/// Errors raised while decoding a backup record from raw bytes.
///
/// Header mismatches are not errors here; they surface through
/// [`super::validate`] so the caller can treat them as absent data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("record length mismatch: expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("key size {0} does not fit the 16-bit size field")]
    KeySizeTooLarge(usize),
}
