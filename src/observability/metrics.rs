//! Counters for key checks and connection monitoring
//!
//! Counters only, monotonic, reset on process start.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    checks_run: AtomicU64,
    backups_saved: AtomicU64,
    backup_save_failures: AtomicU64,
    invalid_backups: AtomicU64,
    mismatches: AtomicU64,
    restores: AtomicU64,
    restore_verify_failures: AtomicU64,
    restarts_requested: AtomicU64,
    connection_failures: AtomicU64,
    triggered_checks: AtomicU64,
}

macro_rules! counter {
    ($inc:ident, $field:ident) => {
        pub fn $inc(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }
    };
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    counter!(increment_checks, checks_run);
    counter!(increment_backups_saved, backups_saved);
    counter!(increment_backup_save_failures, backup_save_failures);
    counter!(increment_invalid_backups, invalid_backups);
    counter!(increment_mismatches, mismatches);
    counter!(increment_restores, restores);
    counter!(increment_restore_verify_failures, restore_verify_failures);
    counter!(increment_restarts_requested, restarts_requested);
    counter!(increment_connection_failures, connection_failures);
    counter!(increment_triggered_checks, triggered_checks);

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            checks_run: self.checks_run.load(Ordering::Relaxed),
            backups_saved: self.backups_saved.load(Ordering::Relaxed),
            backup_save_failures: self.backup_save_failures.load(Ordering::Relaxed),
            invalid_backups: self.invalid_backups.load(Ordering::Relaxed),
            mismatches: self.mismatches.load(Ordering::Relaxed),
            restores: self.restores.load(Ordering::Relaxed),
            restore_verify_failures: self.restore_verify_failures.load(Ordering::Relaxed),
            restarts_requested: self.restarts_requested.load(Ordering::Relaxed),
            connection_failures: self.connection_failures.load(Ordering::Relaxed),
            triggered_checks: self.triggered_checks.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub checks_run: u64,
    pub backups_saved: u64,
    pub backup_save_failures: u64,
    pub invalid_backups: u64,
    pub mismatches: u64,
    pub restores: u64,
    pub restore_verify_failures: u64,
    pub restarts_requested: u64,
    pub connection_failures: u64,
    pub triggered_checks: u64,
}
