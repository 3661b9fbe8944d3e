//! Reconciliation subsystem for keyguard
//!
//! Compares the live key slot with the backup record and resolves any
//! difference according to a [`CheckMode`]:
//!
//! | Mode | Live differs from valid backup |
//! |------|--------------------------------|
//! | `Automatic` | restore live slot, cool down, restart |
//! | `AutomaticNoRestart` | restore live slot, report mismatch |
//! | `CheckOnly` | report mismatch, modify nothing |
//! | `SaveCurrent` | overwrite backup from live slot |
//!
//! The backend is the single source of truth for the backup; no copy of the
//! record outlives a check.

mod engine;
mod errors;
mod report;

pub use engine::{KeyReconciler, ReconcilePolicy, DEFAULT_COOLDOWN, DEFAULT_RESTORE_ATTEMPTS};
pub use errors::{ReconcileError, ReconcileErrorCode, Severity};
pub use report::{BackupState, CheckMode, CheckOutcome, CheckReport};
