//! Check modes and results

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::record::InvalidReason;

use super::errors::ReconcileError;

/// What `check` may do when live keys and backup disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckMode {
    /// Restore the live slot from backup, then restart
    Automatic,
    /// Restore the live slot from backup, no restart
    AutomaticNoRestart,
    /// Report only, modify nothing
    CheckOnly,
    /// Save the live keys to backup unless it already holds them
    SaveCurrent,
}

impl CheckMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckMode::Automatic => "automatic",
            CheckMode::AutomaticNoRestart => "automatic-no-restart",
            CheckMode::CheckOnly => "check-only",
            CheckMode::SaveCurrent => "save-current",
        }
    }

    /// Whether a mismatch overwrites the live slot
    pub fn restores(&self) -> bool {
        matches!(self, CheckMode::Automatic | CheckMode::AutomaticNoRestart)
    }

    /// Whether a confirmed restore is followed by a restart
    pub fn restarts(&self) -> bool {
        matches!(self, CheckMode::Automatic)
    }
}

impl fmt::Display for CheckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CheckMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('_', "-").as_str() {
            "automatic" => Ok(CheckMode::Automatic),
            "automatic-no-restart" => Ok(CheckMode::AutomaticNoRestart),
            "check-only" => Ok(CheckMode::CheckOnly),
            "save-current" => Ok(CheckMode::SaveCurrent),
            other => Err(format!(
                "unknown check mode '{}', expected automatic, automatic-no-restart, check-only or save-current",
                other
            )),
        }
    }
}

/// What the backup medium held when the check read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BackupState {
    /// Not read; the check stopped before loading
    Unchecked,
    /// Load succeeded and the record validated
    Valid,
    /// Medium absent or nothing stored
    Missing,
    /// Medium present but the read failed
    Unreadable,
    /// Load succeeded with content that failed validation
    Invalid { reason: InvalidReason },
}

impl BackupState {
    pub fn is_valid(&self) -> bool {
        matches!(self, BackupState::Valid)
    }
}

/// Decision taken by a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// Live keys and backup agree, nothing written
    Unchanged,
    /// Backup written from the live keys
    Saved,
    /// Backup write attempted and failed
    SaveFailed,
    /// Backup missing or stale, left untouched in `CheckOnly` mode
    SaveNeeded,
    /// Live keys differ from the backup; nothing modified
    Mismatch,
    /// Live slot overwritten from backup and verified by read-back
    Restored { restart_requested: bool },
    /// Live slot write never verified; no restart requested
    RestoreUnverified,
    /// Live keys could not be read; nothing done
    LiveUnreadable,
}

impl CheckOutcome {
    /// True unless live keys were found to differ from a valid backup.
    pub fn keys_intact(&self) -> bool {
        !matches!(
            self,
            CheckOutcome::Mismatch
                | CheckOutcome::Restored { .. }
                | CheckOutcome::RestoreUnverified
        )
    }

    /// True if the backup medium was written
    pub fn wrote_backup(&self) -> bool {
        matches!(self, CheckOutcome::Saved)
    }
}

/// Full result of one check pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub mode: CheckMode,
    #[serde(flatten)]
    pub outcome: CheckOutcome,
    pub backup: BackupState,
    pub errors: Vec<ReconcileError>,
}
