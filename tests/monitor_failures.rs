//! Connection failure monitor tests
//!
//! Covers the counting rules end to end against a real reconciler:
//! - Only failed attempts count, never a drop of an accepted session
//! - The threshold forces a disconnect and an automatic check
//! - A configured rejection code short-circuits the counter
//! - A successful connection refreshes the backup

use std::time::Duration;

use keyguard::backend::{BackupBackend, ImageBackend, MemoryMedium};
use keyguard::keyslot::{KeyLayout, MemoryKeySlot, Transport};
use keyguard::monitor::{
    ConnectionEvent, FailureMonitor, MonitorAction, MonitorPolicy, RejectionCodes, Trigger,
};
use keyguard::platform::{CloudLink, DeviceControl, DiagnosticId};
use keyguard::reconcile::{CheckMode, CheckOutcome, KeyReconciler, ReconcilePolicy};
use keyguard::record::{record_size, BackupRecord};

use ConnectionEvent::{Connected, Connecting, Disconnected};

const KEY_SIZE: usize = 24;

// =============================================================================
// Test Doubles
// =============================================================================

#[derive(Debug, Default)]
struct CountingDevice {
    restarts: usize,
}

impl DeviceControl for CountingDevice {
    fn pause(&mut self, _duration: Duration) {}

    fn request_restart(&mut self) {
        self.restarts += 1;
    }
}

/// Link whose diagnostic answer is scripted per event.
#[derive(Debug, Default)]
struct ScriptedLink {
    code: Option<i32>,
    disconnects: usize,
}

impl CloudLink for ScriptedLink {
    fn disconnect(&mut self) {
        self.disconnects += 1;
    }

    fn diagnostic(&self, id: DiagnosticId) -> Option<i32> {
        match id {
            DiagnosticId::CloudConnectionError => self.code,
        }
    }
}

type TestMonitor = FailureMonitor<ImageBackend<MemoryMedium>, MemoryKeySlot, CountingDevice>;

fn monitor(live: u8, backup: Option<u8>, policy: MonitorPolicy) -> TestMonitor {
    let mut backend = ImageBackend::new(MemoryMedium::new(record_size(KEY_SIZE)), 0, KEY_SIZE);
    if let Some(byte) = backup {
        backend
            .save(&BackupRecord::build(&[byte; KEY_SIZE]).unwrap())
            .unwrap();
    }
    let reconciler = KeyReconciler::new(
        backend,
        MemoryKeySlot::new(vec![live; KEY_SIZE]),
        CountingDevice::default(),
        KeyLayout::opaque(KEY_SIZE).unwrap(),
    )
    .with_policy(ReconcilePolicy {
        cooldown: Duration::ZERO,
        restore_attempts: 1,
    });
    FailureMonitor::new(reconciler, policy)
}

fn udp_rejection_policy() -> MonitorPolicy {
    MonitorPolicy {
        rejection_codes: RejectionCodes::default()
            .with(Transport::Tcp, 10)
            .with(Transport::Udp, 26),
        ..MonitorPolicy::default()
    }
}

// =============================================================================
// Failure Counting
// =============================================================================

#[test]
fn test_third_consecutive_failure_triggers_check() {
    let mut m = monitor(0x02, Some(0x01), MonitorPolicy::default());
    let mut link = ScriptedLink::default();

    let actions: Vec<_> = [Connecting, Disconnected, Connecting, Disconnected, Connecting, Disconnected]
        .into_iter()
        .map(|event| m.handle_event(event, &mut link))
        .collect();

    assert!(actions[..5].iter().all(|a| *a == MonitorAction::None));
    match &actions[5] {
        MonitorAction::Reconciled { trigger, report } => {
            assert_eq!(*trigger, Trigger::FailureThreshold { failures: 3 });
            assert_eq!(report.mode, CheckMode::Automatic);
        }
        other => panic!("expected reconcile, got {:?}", other),
    }
    assert_eq!(link.disconnects, 1);
    assert_eq!(m.state().failure_count, 3);
    assert_eq!(m.reconciler().slot().keys(), &[0x01; KEY_SIZE]);
    assert_eq!(m.reconciler().device().restarts, 1);
}

#[test]
fn test_dropped_sessions_never_count() {
    let mut m = monitor(0x01, Some(0x01), MonitorPolicy::default());
    let mut link = ScriptedLink::default();

    for _ in 0..5 {
        m.handle_event(Connected, &mut link);
        assert_eq!(m.handle_event(Disconnected, &mut link), MonitorAction::None);
    }

    assert_eq!(m.state().failure_count, 0);
    assert_eq!(link.disconnects, 0);
    assert_eq!(m.reconciler().metrics().snapshot().triggered_checks, 0);
}

#[test]
fn test_success_between_failures_resets_count() {
    let mut m = monitor(0x01, Some(0x01), MonitorPolicy::default());
    let mut link = ScriptedLink::default();

    m.handle_event(Disconnected, &mut link);
    m.handle_event(Disconnected, &mut link);
    m.handle_event(Connected, &mut link);
    m.handle_event(Connecting, &mut link);
    m.handle_event(Disconnected, &mut link);
    m.handle_event(Disconnected, &mut link);

    assert_eq!(m.state().failure_count, 2);
    assert_eq!(link.disconnects, 0);
}

#[test]
fn test_every_failure_past_threshold_triggers_again() {
    let mut m = monitor(0x01, Some(0x01), MonitorPolicy::default());
    let mut link = ScriptedLink::default();

    for _ in 0..3 {
        m.handle_event(Disconnected, &mut link);
    }
    assert_eq!(link.disconnects, 1);

    match m.handle_event(Disconnected, &mut link) {
        MonitorAction::Reconciled { trigger, report } => {
            assert_eq!(trigger, Trigger::FailureThreshold { failures: 4 });
            assert_eq!(report.mode, CheckMode::Automatic);
        }
        other => panic!("expected reconcile, got {:?}", other),
    }
    assert_eq!(m.state().failure_count, 4);
    assert_eq!(link.disconnects, 2);

    m.handle_event(Connected, &mut link);
    assert_eq!(m.state().failure_count, 0);
    assert_eq!(m.handle_event(Disconnected, &mut link), MonitorAction::None);
    assert_eq!(m.handle_event(Disconnected, &mut link), MonitorAction::None);
}

// =============================================================================
// Rejection Codes
// =============================================================================

#[test]
fn test_rejection_code_triggers_on_first_failure() {
    let mut m = monitor(0x02, Some(0x01), udp_rejection_policy());
    let mut link = ScriptedLink {
        code: Some(26),
        ..Default::default()
    };

    let action = m.handle_event(Disconnected, &mut link);
    match action {
        MonitorAction::Reconciled { trigger, report } => {
            assert_eq!(trigger, Trigger::KeysRejected { code: 26 });
            assert_eq!(
                report.outcome,
                CheckOutcome::Restored {
                    restart_requested: true
                }
            );
        }
        other => panic!("expected reconcile, got {:?}", other),
    }
    assert_eq!(link.disconnects, 1);
    assert_eq!(m.state().failure_count, 0);
}

#[test]
fn test_unsupported_diagnostic_falls_back_to_counter() {
    let mut m = monitor(0x01, Some(0x01), udp_rejection_policy());
    let mut link = ScriptedLink::default();

    assert_eq!(m.handle_event(Disconnected, &mut link), MonitorAction::None);
    assert_eq!(m.state().failure_count, 1);
    assert_eq!(link.disconnects, 0);
}

#[test]
fn test_codes_are_ignored_when_not_configured() {
    let mut m = monitor(0x01, Some(0x01), MonitorPolicy::default());
    let mut link = ScriptedLink {
        code: Some(26),
        ..Default::default()
    };

    assert_eq!(m.handle_event(Disconnected, &mut link), MonitorAction::None);
    assert_eq!(m.state().failure_count, 1);
}

#[test]
fn test_code_for_other_transport_is_ignored() {
    let policy = MonitorPolicy {
        transport: Some(Transport::Tcp),
        ..udp_rejection_policy()
    };
    let mut m = monitor(0x02, Some(0x01), policy);
    let mut link = ScriptedLink {
        code: Some(26),
        ..Default::default()
    };

    assert_eq!(m.handle_event(Disconnected, &mut link), MonitorAction::None);
    assert_eq!(m.state().failure_count, 1);
    assert_eq!(link.disconnects, 0);

    link.code = Some(10);
    assert!(matches!(
        m.handle_event(Disconnected, &mut link),
        MonitorAction::Reconciled {
            trigger: Trigger::KeysRejected { code: 10 },
            ..
        }
    ));
}

// =============================================================================
// Connected Refresh
// =============================================================================

#[test]
fn test_connected_saves_keys_to_empty_backup() {
    let mut m = monitor(0x05, None, MonitorPolicy::default());
    let mut link = ScriptedLink::default();

    match m.handle_event(Connected, &mut link) {
        MonitorAction::Refreshed { report } => {
            assert_eq!(report.mode, CheckMode::SaveCurrent);
            assert_eq!(report.outcome, CheckOutcome::Saved);
        }
        other => panic!("expected refresh, got {:?}", other),
    }

    match m.handle_event(Connected, &mut link) {
        MonitorAction::Refreshed { report } => {
            assert_eq!(report.outcome, CheckOutcome::Unchanged);
        }
        other => panic!("expected refresh, got {:?}", other),
    }
    assert_eq!(m.reconciler().metrics().snapshot().backups_saved, 1);
}

#[test]
fn test_run_reports_every_event() {
    let mut m = monitor(0x02, Some(0x01), MonitorPolicy {
        failure_threshold: 2,
        ..MonitorPolicy::default()
    });
    let mut link = ScriptedLink::default();
    let mut feed = vec![Connecting, Disconnected, Connecting, Disconnected].into_iter();

    let mut triggered = 0;
    let handled = m.run(&mut feed, &mut link, |_, action| {
        if matches!(action, MonitorAction::Reconciled { .. }) {
            triggered += 1;
        }
    });

    assert_eq!(handled, 4);
    assert_eq!(triggered, 1);
    assert_eq!(link.disconnects, 1);
}
