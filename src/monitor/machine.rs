//! Connection failure state machine

use serde::Serialize;

use crate::backend::BackupBackend;
use crate::keyslot::LiveKeySlot;
use crate::observability::{log_event, Event, Severity};
use crate::platform::{CloudLink, DeviceControl, DiagnosticId};
use crate::reconcile::{CheckMode, CheckReport, KeyReconciler};

use super::event::{ConnectionEvent, EventFeed};
use super::policy::MonitorPolicy;

/// Connection state tracked between events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonitorState {
    /// True between `Connected` and the next `Connecting`/`Disconnected`
    pub connected: bool,
    /// Consecutive failed attempts since the last `Connected`
    pub failure_count: usize,
}

/// Why the monitor forced a key check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    /// The last connection error code identifies rejected keys
    KeysRejected { code: i32 },
    /// Too many consecutive failed attempts
    FailureThreshold { failures: usize },
}

/// What handling one event produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MonitorAction {
    /// State updated, nothing else
    None,
    /// Connected: backup refreshed from the now-proven live keys
    Refreshed { report: CheckReport },
    /// Connection forced down and an automatic check run
    Reconciled { trigger: Trigger, report: CheckReport },
}

/// Watches connectivity and runs key checks when the pattern of failures
/// suggests the live keys went bad.
///
/// Owns the reconciler, so checks never overlap.
pub struct FailureMonitor<B, S, D> {
    reconciler: KeyReconciler<B, S, D>,
    policy: MonitorPolicy,
    state: MonitorState,
}

impl<B, S, D> FailureMonitor<B, S, D>
where
    B: BackupBackend,
    S: LiveKeySlot,
    D: DeviceControl,
{
    pub fn new(reconciler: KeyReconciler<B, S, D>, policy: MonitorPolicy) -> Self {
        Self {
            reconciler,
            policy,
            state: MonitorState::default(),
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn policy(&self) -> &MonitorPolicy {
        &self.policy
    }

    pub fn reconciler(&self) -> &KeyReconciler<B, S, D> {
        &self.reconciler
    }

    pub fn reconciler_mut(&mut self) -> &mut KeyReconciler<B, S, D> {
        &mut self.reconciler
    }

    pub fn into_reconciler(self) -> KeyReconciler<B, S, D> {
        self.reconciler
    }

    /// Apply one connectivity event.
    pub fn handle_event<L: CloudLink>(&mut self, event: ConnectionEvent, link: &mut L) -> MonitorAction {
        match event {
            ConnectionEvent::Connecting => {
                self.state.connected = false;
                log_event(
                    Severity::Trace,
                    Event::ConnectionAttempt,
                    &[("failures", &self.state.failure_count.to_string())],
                );
                MonitorAction::None
            }
            ConnectionEvent::Connected => {
                self.state.connected = true;
                self.state.failure_count = 0;
                log_event(Severity::Info, Event::ConnectionEstablished, &[]);
                let report = self.reconciler.check(CheckMode::SaveCurrent);
                MonitorAction::Refreshed { report }
            }
            ConnectionEvent::Disconnected if self.state.connected => {
                self.state.connected = false;
                log_event(Severity::Info, Event::ConnectionDropped, &[]);
                MonitorAction::None
            }
            ConnectionEvent::Disconnected => self.connection_failed(link),
        }
    }

    fn connection_failed<L: CloudLink>(&mut self, link: &mut L) -> MonitorAction {
        self.reconciler.metrics().increment_connection_failures();

        let code = link.diagnostic(DiagnosticId::CloudConnectionError);
        if let Some(code) = code {
            if let Some(transport) = self
                .policy
                .rejection_codes
                .matches(code, self.policy.transport) {
                log_event(
                    Severity::Warn,
                    Event::KeysRejected,
                    &[("code", &code.to_string()), ("transport", transport.as_str())],
                );
                return self.trigger(link, Trigger::KeysRejected { code });
            }
        }

        self.state.failure_count += 1;
        let failures = self.state.failure_count;
        let code_str = code.map_or_else(|| "unknown".to_string(), |c| c.to_string());
        log_event(
            Severity::Warn,
            Event::ConnectionFailed,
            &[("failures", &failures.to_string()), ("code", &code_str)],
        );

        if failures >= self.policy.failure_threshold {
            log_event(
                Severity::Warn,
                Event::FailureThreshold,
                &[
                    ("failures", &failures.to_string()),
                    ("threshold", &self.policy.failure_threshold.to_string()),
                ],
            );
            return self.trigger(link, Trigger::FailureThreshold { failures });
        }

        MonitorAction::None
    }

    fn trigger<L: CloudLink>(&mut self, link: &mut L, trigger: Trigger) -> MonitorAction {
        link.disconnect();
        self.reconciler.metrics().increment_triggered_checks();
        let report = self.reconciler.check(CheckMode::Automatic);
        MonitorAction::Reconciled { trigger, report }
    }

    /// Drain `feed`, handing every action to `sink`. Returns the number of
    /// events handled.
    pub fn run<F, L, K>(&mut self, feed: &mut F, link: &mut L, mut sink: K) -> usize
    where
        F: EventFeed + ?Sized,
        L: CloudLink,
        K: FnMut(ConnectionEvent, MonitorAction),
    {
        let mut handled = 0;
        while let Some(event) = feed.next_event() {
            let action = self.handle_event(event, link);
            sink(event, action);
            handled += 1;
        }
        handled
    }
}
