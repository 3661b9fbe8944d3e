//! CLI command implementations
//!
//! Each command loads and validates the config before opening any medium.
//! `check` and `monitor` share the same reconciler wiring; `inspect` never
//! writes.

use std::io;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Value};

use crate::backend::BackupBackend;
use crate::config::KeyguardConfig;
use crate::keyslot::{FileKeySlot, LiveKeySlot};
use crate::monitor::FailureMonitor;
use crate::observability::{fingerprint, LogStream, Logger};
use crate::platform::{CloudLink, DiagnosticId, HostDevice};
use crate::reconcile::{CheckMode, KeyReconciler};
use crate::record::{compute_checksum, validate, Validity};

use super::args::Command;
use super::errors::{CliErrorCode, CliResult};
use super::io::{read_events, write_error, write_response};

type HostReconciler = KeyReconciler<Box<dyn BackupBackend>, FileKeySlot, HostDevice>;

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call. Stdout carries
/// responses only; log lines go to stderr.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    Logger::set_routine_stream(LogStream::Stderr);
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Check { config, mode } => check(&config, mode),
        Command::Inspect {
            config,
            show_payload,
        } => inspect(&config, show_payload),
        Command::Monitor { config } => monitor(&config),
    }
}

fn build_reconciler(config: &KeyguardConfig) -> CliResult<HostReconciler> {
    Ok(KeyReconciler::new(
        config.open_backend()?,
        config.open_live_slot()?,
        HostDevice::new(),
        config.layout()?,
    )
    .with_policy(config.reconcile_policy()))
}

/// Run one check pass and print the report
pub fn check(config_path: &Path, mode: CheckMode) -> CliResult<()> {
    let config = KeyguardConfig::load(config_path)?;
    let mut reconciler = build_reconciler(&config)?;

    let report = reconciler.check(mode);

    write_response(json!({
        "report": report,
        "metrics": reconciler.metrics().snapshot(),
    }))
}

/// Describe the stored backup and compare it with the live keys
pub fn inspect(config_path: &Path, show_payload: bool) -> CliResult<()> {
    let config = KeyguardConfig::load(config_path)?;
    let key_size = config.layout()?.key_size();
    let mut backend = config.open_backend()?;
    let mut slot = config.open_live_slot()?;

    let live = slot.read_keys();

    let (backup, record) = match backend.load() {
        Ok(record) => {
            let state = match validate(&record, key_size) {
                Validity::Valid => json!({"state": "valid"}),
                Validity::Invalid(reason) => json!({"state": "invalid", "reason": reason}),
            };
            let mut details = json!({
                "magic": format!("{:#010x}", record.magic),
                "declared_size": record.declared_size,
                "checksum": record.checksum,
                "computed_checksum": compute_checksum(&record.payload),
                "fingerprint": fingerprint(&record.payload),
            });
            if show_payload {
                details["payload"] = Value::String(STANDARD.encode(&record.payload));
            }
            (state, Some((record, details)))
        }
        Err(err) => {
            let state = if err.is_unavailable() {
                "missing"
            } else {
                "unreadable"
            };
            (json!({"state": state, "error": err.to_string()}), None)
        }
    };

    let live = match &live {
        Ok(keys) => json!({
            "fingerprint": fingerprint(keys),
            "matches_backup": record
                .as_ref()
                .map(|(r, _)| r.payload == *keys),
        }),
        Err(err) => json!({"error": err.to_string()}),
    };

    write_response(json!({
        "backend": backend.describe(),
        "key_size": key_size,
        "backup": backup,
        "record": record.map(|(_, details)| details),
        "live": live,
    }))
}

/// Cloud link fed from event lines.
///
/// The host cannot drop a real cloud session, so a disconnect is only
/// recorded and surfaced in the next response.
#[derive(Debug, Default)]
pub struct ReportedLink {
    last_code: Option<i32>,
    disconnect_requested: bool,
}

impl ReportedLink {
    pub fn set_code(&mut self, code: Option<i32>) {
        self.last_code = code;
    }

    pub fn take_disconnect(&mut self) -> bool {
        std::mem::take(&mut self.disconnect_requested)
    }
}

impl CloudLink for ReportedLink {
    fn disconnect(&mut self) {
        self.disconnect_requested = true;
    }

    fn diagnostic(&self, id: DiagnosticId) -> Option<i32> {
        match id {
            DiagnosticId::CloudConnectionError => self.last_code,
        }
    }
}

/// Feed stdin event lines to the failure monitor, one response per line
pub fn monitor(config_path: &Path) -> CliResult<()> {
    let config = KeyguardConfig::load(config_path)?;
    let mut monitor = FailureMonitor::new(build_reconciler(&config)?, config.monitor_policy());
    let mut link = ReportedLink::default();

    let stdin = io::stdin();
    for line in read_events(stdin.lock()) {
        let line = match line {
            Ok(line) => line,
            Err(e) if e.code() == &CliErrorCode::InvalidInput => {
                write_error(e.code_str(), e.message())?;
                continue;
            }
            Err(e) => return Err(e),
        };

        link.set_code(line.error_code);
        let action = monitor.handle_event(line.event, &mut link);

        write_response(json!({
            "event": line.event,
            "action": action,
            "state": monitor.state(),
            "disconnect_requested": link.take_disconnect(),
        }))?;
    }

    write_response(json!({
        "state": monitor.state(),
        "metrics": monitor.reconciler().metrics().snapshot(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reported_link_surfaces_disconnect_once() {
        let mut link = ReportedLink::default();
        link.set_code(Some(26));
        assert_eq!(link.diagnostic(DiagnosticId::CloudConnectionError), Some(26));

        link.disconnect();
        assert!(link.take_disconnect());
        assert!(!link.take_disconnect());
    }
}
