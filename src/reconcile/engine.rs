//! Key reconciliation engine
//!
//! # Check sequence
//!
//! 1. Read the live keys
//! 2. Load the backup record
//! 3. Load failed or record invalid → save branch
//! 4. Record valid and equal → unchanged, no I/O
//! 5. Record valid and different → report, or restore per mode
//! 6. Save branch: write a fresh record unless the stored payload already
//!    equals the live keys, header validity aside (`CheckOnly` reports the
//!    stale backup instead of writing)
//!
//! `SaveCurrent` skips straight to the save branch.
//!
//! A check performs at most one backend write. Backend and slot failures are
//! absorbed into the report; the only deliberate disruption is the restart
//! that follows a verified restore in `Automatic` mode.

use std::time::Duration;

use subtle::ConstantTimeEq;

use crate::backend::BackupBackend;
use crate::crash_point::{maybe_crash, points};
use crate::keyslot::{KeyLayout, KeySlotError, LiveKeySlot};
use crate::observability::{fingerprint, log_event, Event, MetricsRegistry, Severity};
use crate::platform::DeviceControl;
use crate::record::{validate, BackupRecord, Validity};

use super::errors::{ReconcileError, ReconcileErrorCode};
use super::report::{BackupState, CheckMode, CheckOutcome, CheckReport};

/// Pause before a restart, bounding the rate of restore writes to the live
/// slot if keys keep coming back mismatched.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5);

/// Write + read-back rounds before a restore is abandoned.
pub const DEFAULT_RESTORE_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilePolicy {
    pub cooldown: Duration,
    pub restore_attempts: u32,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
            restore_attempts: DEFAULT_RESTORE_ATTEMPTS,
        }
    }
}

/// Equal length and equal bytes, compared in constant time.
fn keys_equal(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

/// Compares live keys with the backup and resolves differences.
///
/// Not reentrant: drive one instance from a single event context.
pub struct KeyReconciler<B, S, D> {
    backend: B,
    slot: S,
    device: D,
    layout: KeyLayout,
    policy: ReconcilePolicy,
    metrics: MetricsRegistry,
}

impl<B, S, D> KeyReconciler<B, S, D>
where
    B: BackupBackend,
    S: LiveKeySlot,
    D: DeviceControl,
{
    pub fn new(backend: B, slot: S, device: D, layout: KeyLayout) -> Self {
        Self {
            backend,
            slot,
            device,
            layout,
            policy: ReconcilePolicy::default(),
            metrics: MetricsRegistry::new(),
        }
    }

    pub fn with_policy(mut self, policy: ReconcilePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn layout(&self) -> KeyLayout {
        self.layout
    }

    pub fn policy(&self) -> ReconcilePolicy {
        self.policy
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    pub fn slot_mut(&mut self) -> &mut S {
        &mut self.slot
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn into_parts(self) -> (B, S, D) {
        (self.backend, self.slot, self.device)
    }

    /// Run one reconciliation pass.
    ///
    /// In `Automatic` mode a verified restore ends in
    /// [`DeviceControl::request_restart`], which does not return on a real
    /// device.
    pub fn check(&mut self, mode: CheckMode) -> CheckReport {
        self.metrics.increment_checks();
        let backend_name = self.backend.describe();
        log_event(
            Severity::Info,
            Event::CheckBegin,
            &[("mode", mode.as_str()), ("backend", &backend_name)],
        );

        let mut errors = Vec::new();

        let live = match self.read_live() {
            Ok(live) => live,
            Err(err) => {
                let err = ReconcileError::live_unreadable(&err);
                log_event(
                    Severity::Error,
                    Event::LiveSlotUnreadable,
                    &[("error", err.message())],
                );
                errors.push(err);
                return CheckReport {
                    mode,
                    outcome: CheckOutcome::LiveUnreadable,
                    backup: BackupState::Unchecked,
                    errors,
                };
            }
        };

        let (backup, record) = self.load_backup(&mut errors);

        let outcome = match record {
            Some(record) if mode != CheckMode::SaveCurrent && backup.is_valid() => {
                if keys_equal(&record.payload, &live) {
                    log_event(
                        Severity::Info,
                        Event::KeysUnchanged,
                        &[("fingerprint", &fingerprint(&live))],
                    );
                    CheckOutcome::Unchanged
                } else {
                    self.resolve_mismatch(mode, &live, &record.payload, &mut errors)
                }
            }
            existing => self.save_live(mode, &live, existing.as_ref(), &mut errors),
        };

        CheckReport {
            mode,
            outcome,
            backup,
            errors,
        }
    }

    fn read_live(&mut self) -> Result<Vec<u8>, KeySlotError> {
        let keys = self.slot.read_keys()?;
        let expected = self.layout.key_size();
        if keys.len() != expected {
            return Err(KeySlotError::Length {
                expected,
                actual: keys.len(),
            });
        }
        Ok(keys)
    }

    fn load_backup(
        &mut self,
        errors: &mut Vec<ReconcileError>,
    ) -> (BackupState, Option<BackupRecord>) {
        match self.backend.load() {
            Ok(record) => match validate(&record, self.layout.key_size()) {
                Validity::Valid => (BackupState::Valid, Some(record)),
                Validity::Invalid(reason) => {
                    self.metrics.increment_invalid_backups();
                    let magic = format!("{:#010x}", record.magic);
                    let size = record.declared_size.to_string();
                    log_event(
                        Severity::Warn,
                        Event::BackupInvalid,
                        &[
                            ("reason", reason.as_str()),
                            ("magic", &magic),
                            ("declared_size", &size),
                        ],
                    );
                    errors.push(ReconcileError::invalid_record(reason));
                    (BackupState::Invalid { reason }, Some(record))
                }
            },
            Err(err) => {
                let state = if err.is_unavailable() {
                    BackupState::Missing
                } else {
                    BackupState::Unreadable
                };
                let err = ReconcileError::from_backend(&err);
                log_event(
                    Severity::Warn,
                    Event::BackupMissing,
                    &[("code", err.code().code()), ("error", err.message())],
                );
                errors.push(err);
                (state, None)
            }
        }
    }

    /// Save branch. Skips the write when the stored payload equals the live
    /// keys, even if the header failed validation, and never writes in
    /// `CheckOnly`.
    fn save_live(
        &mut self,
        mode: CheckMode,
        live: &[u8],
        existing: Option<&BackupRecord>,
        errors: &mut Vec<ReconcileError>,
    ) -> CheckOutcome {
        let fp = fingerprint(live);
        if existing.is_some_and(|record| keys_equal(&record.payload, live)) {
            log_event(Severity::Info, Event::BackupCurrent, &[("fingerprint", &fp)]);
            return CheckOutcome::Unchanged;
        }

        if mode == CheckMode::CheckOnly {
            log_event(
                Severity::Warn,
                Event::BackupOutdated,
                &[("fingerprint", &fp), ("mode", mode.as_str())],
            );
            return CheckOutcome::SaveNeeded;
        }

        let fresh = match BackupRecord::build(live) {
            Ok(record) => record,
            Err(err) => {
                // KeyLayout bounds the key size, so only a misbehaving slot gets here
                let err = ReconcileError::new(ReconcileErrorCode::LiveSlotUnreadable, err.to_string());
                log_event(
                    Severity::Error,
                    Event::BackupSaveFailed,
                    &[("error", err.message())],
                );
                errors.push(err);
                return CheckOutcome::SaveFailed;
            }
        };

        match self.backend.save(&fresh) {
            Ok(()) => {
                self.metrics.increment_backups_saved();
                log_event(Severity::Info, Event::BackupSaved, &[("fingerprint", &fp)]);
                CheckOutcome::Saved
            }
            Err(err) => {
                self.metrics.increment_backup_save_failures();
                let err = ReconcileError::from_backend(&err);
                log_event(
                    Severity::Warn,
                    Event::BackupSaveFailed,
                    &[("code", err.code().code()), ("error", err.message())],
                );
                errors.push(err);
                CheckOutcome::SaveFailed
            }
        }
    }

    fn resolve_mismatch(
        &mut self,
        mode: CheckMode,
        live: &[u8],
        backup: &[u8],
        errors: &mut Vec<ReconcileError>,
    ) -> CheckOutcome {
        self.metrics.increment_mismatches();
        log_event(
            Severity::Warn,
            Event::KeysMismatch,
            &[
                ("mode", mode.as_str()),
                ("live", &fingerprint(live)),
                ("backup", &fingerprint(backup)),
            ],
        );

        if !mode.restores() {
            return CheckOutcome::Mismatch;
        }

        if !self.restore_live(backup, errors) {
            log_event(
                Severity::Error,
                Event::RestoreAbandoned,
                &[("attempts", &self.policy.restore_attempts.to_string())],
            );
            return CheckOutcome::RestoreUnverified;
        }

        self.metrics.increment_restores();
        log_event(
            Severity::Info,
            Event::KeysRestored,
            &[("fingerprint", &fingerprint(backup))],
        );

        if !mode.restarts() {
            return CheckOutcome::Restored {
                restart_requested: false,
            };
        }

        let cooldown_ms = self.policy.cooldown.as_millis().to_string();
        log_event(
            Severity::Warn,
            Event::RestartCooldown,
            &[("cooldown_ms", &cooldown_ms)],
        );
        self.device.pause(self.policy.cooldown);
        maybe_crash(points::RESTORE_BEFORE_RESTART);

        self.metrics.increment_restarts_requested();
        log_event(Severity::Warn, Event::RestartRequested, &[]);
        self.device.request_restart();

        CheckOutcome::Restored {
            restart_requested: true,
        }
    }

    /// Write `keys` to the live slot and confirm by reading them back.
    /// A successful write return alone is not trusted.
    fn restore_live(&mut self, keys: &[u8], errors: &mut Vec<ReconcileError>) -> bool {
        for attempt in 1..=self.policy.restore_attempts {
            let attempt_str = attempt.to_string();

            if let Err(err) = self.slot.write_keys(keys) {
                let err = ReconcileError::live_write_failed(attempt, &err);
                log_event(
                    Severity::Error,
                    Event::RestoreVerifyFailed,
                    &[("attempt", &attempt_str), ("error", err.message())],
                );
                errors.push(err);
                continue;
            }
            maybe_crash(points::RESTORE_AFTER_LIVE_WRITE);

            let detail = match self.slot.read_keys() {
                Ok(readback) if keys_equal(&readback, keys) => return true,
                Ok(readback) => format!("read back {} differs", fingerprint(&readback)),
                Err(err) => format!("read back failed: {}", err),
            };

            self.metrics.increment_restore_verify_failures();
            let err = ReconcileError::write_verification_failed(attempt, detail);
            log_event(
                Severity::Error,
                Event::RestoreVerifyFailed,
                &[("attempt", &attempt_str), ("error", err.message())],
            );
            errors.push(err);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ImageBackend, MemoryMedium};
    use crate::keyslot::MemoryKeySlot;
    use crate::record::{record_size, InvalidReason};

    const KEY_SIZE: usize = 32;

    #[derive(Debug, Default)]
    struct RecordingDevice {
        pauses: Vec<Duration>,
        restarts: usize,
    }

    impl DeviceControl for RecordingDevice {
        fn pause(&mut self, duration: Duration) {
            self.pauses.push(duration);
        }

        fn request_restart(&mut self) {
            self.restarts += 1;
        }
    }

    type TestReconciler = KeyReconciler<ImageBackend<MemoryMedium>, MemoryKeySlot, RecordingDevice>;

    fn reconciler(live: Vec<u8>, backup: Option<&[u8]>) -> TestReconciler {
        let mut backend = ImageBackend::new(MemoryMedium::new(record_size(KEY_SIZE)), 0, KEY_SIZE);
        if let Some(payload) = backup {
            backend.save(&BackupRecord::build(payload).unwrap()).unwrap();
        }
        KeyReconciler::new(
            backend,
            MemoryKeySlot::new(live),
            RecordingDevice::default(),
            KeyLayout::opaque(KEY_SIZE).unwrap(),
        )
    }

    fn stored(r: &mut TestReconciler) -> BackupRecord {
        r.backend_mut().load().unwrap()
    }

    #[test]
    fn test_matching_keys_are_unchanged() {
        let mut r = reconciler(vec![7; KEY_SIZE], Some(&[7; KEY_SIZE]));
        let report = r.check(CheckMode::Automatic);
        assert_eq!(report.outcome, CheckOutcome::Unchanged);
        assert_eq!(report.backup, BackupState::Valid);
        assert!(report.errors.is_empty());
        assert_eq!(r.slot().writes(), 0);
    }

    #[test]
    fn test_erased_backup_takes_save_branch() {
        let mut r = reconciler(vec![1; KEY_SIZE], None);
        let report = r.check(CheckMode::Automatic);

        assert_eq!(report.outcome, CheckOutcome::Saved);
        assert_eq!(
            report.backup,
            BackupState::Invalid {
                reason: InvalidReason::BadMagic
            }
        );
        let record = stored(&mut r);
        assert!(record.is_valid(KEY_SIZE));
        assert_eq!(record.checksum, 0x20);
        assert_eq!(r.device().restarts, 0);
    }

    #[test]
    fn test_no_restart_mode_restores_without_restart() {
        let mut r = reconciler(vec![2; KEY_SIZE], Some(&[1; KEY_SIZE]));
        let report = r.check(CheckMode::AutomaticNoRestart);

        assert_eq!(
            report.outcome,
            CheckOutcome::Restored {
                restart_requested: false
            }
        );
        assert!(!report.outcome.keys_intact());
        assert_eq!(r.slot().keys(), &[1; KEY_SIZE]);
        assert!(r.device().pauses.is_empty());
        assert_eq!(r.device().restarts, 0);
    }

    #[test]
    fn test_automatic_restores_cools_down_and_restarts() {
        let mut r = reconciler(vec![2; KEY_SIZE], Some(&[1; KEY_SIZE])).with_policy(
            ReconcilePolicy {
                cooldown: Duration::from_millis(250),
                restore_attempts: 1,
            },
        );
        let report = r.check(CheckMode::Automatic);

        assert_eq!(
            report.outcome,
            CheckOutcome::Restored {
                restart_requested: true
            }
        );
        assert_eq!(r.device().pauses, vec![Duration::from_millis(250)]);
        assert_eq!(r.device().restarts, 1);
        assert_eq!(r.metrics().snapshot().restarts_requested, 1);
    }

    #[test]
    fn test_save_current_is_idempotent() {
        let mut r = reconciler(vec![3; KEY_SIZE], None);
        assert_eq!(r.check(CheckMode::SaveCurrent).outcome, CheckOutcome::Saved);
        assert_eq!(r.check(CheckMode::SaveCurrent).outcome, CheckOutcome::Unchanged);
        assert_eq!(r.metrics().snapshot().backups_saved, 1);
    }

    #[test]
    fn test_save_current_overwrites_different_backup() {
        let mut r = reconciler(vec![4; KEY_SIZE], Some(&[5; KEY_SIZE]));
        let report = r.check(CheckMode::SaveCurrent);
        assert_eq!(report.outcome, CheckOutcome::Saved);
        assert_eq!(stored(&mut r).payload, vec![4; KEY_SIZE]);
        assert_eq!(r.slot().writes(), 0);
    }

    #[test]
    fn test_matching_payload_with_bad_checksum_is_not_rewritten() {
        let mut r = reconciler(vec![6; KEY_SIZE], Some(&[6; KEY_SIZE]));
        r.backend_mut().medium_mut().as_bytes_mut()[6] ^= 0x01;
        let before = r.backend().medium().as_bytes().to_vec();

        for mode in [CheckMode::AutomaticNoRestart, CheckMode::SaveCurrent] {
            let report = r.check(mode);
            assert_eq!(report.outcome, CheckOutcome::Unchanged);
            assert_eq!(
                report.backup,
                BackupState::Invalid {
                    reason: InvalidReason::ChecksumMismatch
                }
            );
        }
        assert_eq!(r.backend().medium().as_bytes(), &before[..]);
        assert_eq!(r.metrics().snapshot().backups_saved, 0);
    }

    #[test]
    fn test_check_only_leaves_missing_backup_alone() {
        let mut r = reconciler(vec![8; KEY_SIZE], None);
        let before = r.backend().medium().as_bytes().to_vec();

        let report = r.check(CheckMode::CheckOnly);
        assert_eq!(report.outcome, CheckOutcome::SaveNeeded);
        assert!(report.outcome.keys_intact());
        assert_eq!(r.backend().medium().as_bytes(), &before[..]);
    }

    #[test]
    fn test_wrong_length_live_keys_are_unreadable() {
        let mut r = reconciler(vec![1; KEY_SIZE - 1], Some(&[1; KEY_SIZE]));
        let report = r.check(CheckMode::Automatic);
        assert_eq!(report.outcome, CheckOutcome::LiveUnreadable);
        assert_eq!(report.backup, BackupState::Unchecked);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_keys_equal_requires_same_length() {
        assert!(keys_equal(&[1, 2, 3], &[1, 2, 3]));
        assert!(!keys_equal(&[1, 2, 3], &[1, 2]));
        assert!(!keys_equal(&[1, 2, 3], &[1, 2, 4]));
    }
}
