//! Reconciliation error taxonomy
//!
//! Error codes:
//! - KEYGUARD_BACKEND_UNAVAILABLE (WARN) - medium absent or not mounted
//! - KEYGUARD_BACKEND_IO_ERROR (WARN) - medium read/write failed
//! - KEYGUARD_INVALID_RECORD (WARN) - magic, size or checksum mismatch
//! - KEYGUARD_WRITE_VERIFICATION_FAILED (ERROR) - restored keys did not read back
//! - KEYGUARD_LIVE_SLOT_UNREADABLE (ERROR) - live keys could not be read
//! - KEYGUARD_LIVE_SLOT_WRITE_FAILED (ERROR) - live slot rejected the write
//!
//! None of these abort a check. They are absorbed, logged, and carried in
//! the [`super::CheckReport`] for diagnostics.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::backend::BackendError;
use crate::keyslot::KeySlotError;
use crate::record::InvalidReason;

/// Severity of an absorbed error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Degraded to the save branch, no data at risk
    Warning,
    /// Live key material may be affected
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileErrorCode {
    BackendUnavailable,
    BackendIoError,
    InvalidRecord,
    WriteVerificationFailed,
    LiveSlotUnreadable,
    LiveSlotWriteFailed,
}

impl ReconcileErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ReconcileErrorCode::BackendUnavailable => "KEYGUARD_BACKEND_UNAVAILABLE",
            ReconcileErrorCode::BackendIoError => "KEYGUARD_BACKEND_IO_ERROR",
            ReconcileErrorCode::InvalidRecord => "KEYGUARD_INVALID_RECORD",
            ReconcileErrorCode::WriteVerificationFailed => "KEYGUARD_WRITE_VERIFICATION_FAILED",
            ReconcileErrorCode::LiveSlotUnreadable => "KEYGUARD_LIVE_SLOT_UNREADABLE",
            ReconcileErrorCode::LiveSlotWriteFailed => "KEYGUARD_LIVE_SLOT_WRITE_FAILED",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ReconcileErrorCode::BackendUnavailable
            | ReconcileErrorCode::BackendIoError
            | ReconcileErrorCode::InvalidRecord => Severity::Warning,
            ReconcileErrorCode::WriteVerificationFailed
            | ReconcileErrorCode::LiveSlotUnreadable
            | ReconcileErrorCode::LiveSlotWriteFailed => Severity::Error,
        }
    }
}

impl fmt::Display for ReconcileErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl Serialize for ReconcileErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

/// An error absorbed during a check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileError {
    code: ReconcileErrorCode,
    message: String,
}

impl ReconcileError {
    pub fn new(code: ReconcileErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Classify a backend failure
    pub fn from_backend(err: &BackendError) -> Self {
        let code = if err.is_unavailable() {
            ReconcileErrorCode::BackendUnavailable
        } else {
            ReconcileErrorCode::BackendIoError
        };
        Self::new(code, err.to_string())
    }

    pub fn invalid_record(reason: InvalidReason) -> Self {
        Self::new(
            ReconcileErrorCode::InvalidRecord,
            format!("backup record failed validation: {}", reason),
        )
    }

    pub fn write_verification_failed(attempt: u32, detail: impl fmt::Display) -> Self {
        Self::new(
            ReconcileErrorCode::WriteVerificationFailed,
            format!("restore attempt {}: {}", attempt, detail),
        )
    }

    pub fn live_unreadable(err: &KeySlotError) -> Self {
        Self::new(ReconcileErrorCode::LiveSlotUnreadable, err.to_string())
    }

    pub fn live_write_failed(attempt: u32, err: &KeySlotError) -> Self {
        Self::new(
            ReconcileErrorCode::LiveSlotWriteFailed,
            format!("restore attempt {}: {}", attempt, err),
        )
    }

    pub fn code(&self) -> ReconcileErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for ReconcileError {}
