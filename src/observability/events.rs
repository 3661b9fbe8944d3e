//! Observable events for keyguard
//!
//! Every decision the reconciler or the monitor takes has one named event.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Reconciliation
    /// A check pass starts
    CheckBegin,
    /// Live keys match the backup
    KeysUnchanged,
    /// Backup medium could not be read
    BackupMissing,
    /// Backup was read but failed validation
    BackupInvalid,
    /// Backup already holds the live keys, write skipped
    BackupCurrent,
    /// Live keys written to the backup medium
    BackupSaved,
    /// Backup write failed
    BackupSaveFailed,
    /// Backup needs saving but the mode forbids writes
    BackupOutdated,
    /// Live keys differ from a valid backup
    KeysMismatch,
    /// Live slot overwritten from backup and verified
    KeysRestored,
    /// Live slot write did not read back correctly
    RestoreVerifyFailed,
    /// Restore abandoned after all attempts
    RestoreAbandoned,
    /// Cooldown before restart begins
    RestartCooldown,
    /// Restart requested
    RestartRequested,
    /// Live slot could not be read
    LiveSlotUnreadable,

    // Connection monitor
    /// Connection attempt started
    ConnectionAttempt,
    /// Cloud connection established
    ConnectionEstablished,
    /// Established connection dropped
    ConnectionDropped,
    /// Connection attempt failed
    ConnectionFailed,
    /// Server rejected the device keys
    KeysRejected,
    /// Failure threshold reached
    FailureThreshold,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::CheckBegin => "KEY_CHECK_BEGIN",
            Event::KeysUnchanged => "KEYS_UNCHANGED",
            Event::BackupMissing => "BACKUP_MISSING",
            Event::BackupInvalid => "BACKUP_INVALID",
            Event::BackupCurrent => "BACKUP_CURRENT",
            Event::BackupSaved => "BACKUP_SAVED",
            Event::BackupSaveFailed => "BACKUP_SAVE_FAILED",
            Event::BackupOutdated => "BACKUP_OUTDATED",
            Event::KeysMismatch => "KEYS_MISMATCH",
            Event::KeysRestored => "KEYS_RESTORED",
            Event::RestoreVerifyFailed => "RESTORE_VERIFY_FAILED",
            Event::RestoreAbandoned => "RESTORE_ABANDONED",
            Event::RestartCooldown => "RESTART_COOLDOWN",
            Event::RestartRequested => "RESTART_REQUESTED",
            Event::LiveSlotUnreadable => "LIVE_SLOT_UNREADABLE",

            Event::ConnectionAttempt => "CONNECTION_ATTEMPT",
            Event::ConnectionEstablished => "CONNECTION_ESTABLISHED",
            Event::ConnectionDropped => "CONNECTION_DROPPED",
            Event::ConnectionFailed => "CONNECTION_FAILED",
            Event::KeysRejected => "KEYS_REJECTED",
            Event::FailureThreshold => "FAILURE_THRESHOLD_REACHED",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
