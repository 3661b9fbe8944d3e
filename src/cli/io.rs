//! JSON I/O handling for CLI
//!
//! - Input: JSON lines on stdin (monitor only)
//! - Output: one JSON object per response on stdout
//! - UTF-8 only

use std::io::{self, BufRead, Write};

use serde::Deserialize;
use serde_json::Value;

use crate::monitor::ConnectionEvent;

use super::errors::{CliError, CliResult};

/// One connection event line, e.g. `{"event":"disconnected","error_code":26}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EventLine {
    pub event: ConnectionEvent,
    /// Last connection error code the firmware reported, if it exposes one
    #[serde(default)]
    pub error_code: Option<i32>,
}

pub fn parse_event_line(line: &str) -> CliResult<EventLine> {
    serde_json::from_str(line)
        .map_err(|e| CliError::invalid_input(format!("bad event line: {}", e)))
}

/// Event lines from a reader. Blank lines are skipped.
pub fn read_events<R: BufRead>(reader: R) -> impl Iterator<Item = CliResult<EventLine>> {
    reader.lines().filter_map(|line| match line {
        Ok(line) if line.trim().is_empty() => None,
        Ok(line) => Some(parse_event_line(&line)),
        Err(e) => Some(Err(CliError::from(e))),
    })
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });

    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, &response)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });

    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, &response)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}
