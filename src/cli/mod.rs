//! CLI module for keyguard
//!
//! Provides command-line interface for:
//! - check: one reconciliation pass
//! - inspect: read-only dump of the backup record
//! - monitor: failure monitor driven by JSON-lines events on stdin

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check, inspect, monitor, run, run_command, ReportedLink};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{parse_event_line, read_events, write_error, write_response, EventLine};
