//! Structured JSON logger for keyguard
//!
//! - One log line = one JSON object
//! - `event` first, then `severity`, then fields sorted by key
//! - Synchronous, unbuffered
//! - ERROR and FATAL go to stderr; TRACE, INFO and WARN go to the routine
//!   stream, stdout unless [`Logger::set_routine_stream`] moves it
//!
//! `KEYGUARD_LOG_LEVEL` (trace, info, warn, error, fatal) sets the minimum
//! severity written. The default is `info`.

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

/// Environment variable holding the minimum severity
pub const LOG_LEVEL_ENV: &str = "KEYGUARD_LOG_LEVEL";

/// Logger category stamped on every line
pub const LOG_TARGET: &str = "keyguard.keys";

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Byte-level detail
    Trace = 0,
    /// Decision path of normal operation
    Info = 1,
    /// Absorbed failures, degraded behavior
    Warn = 2,
    /// Operation failures
    Error = 3,
    /// Unrecoverable
    Fatal = 4,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    /// Parse a level name, case-insensitive
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(Severity::Trace),
            "info" => Some(Severity::Info),
            "warn" | "warning" => Some(Severity::Warn),
            "error" => Some(Severity::Error),
            "fatal" => Some(Severity::Fatal),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static MIN_SEVERITY: OnceLock<Severity> = OnceLock::new();

fn min_severity() -> Severity {
    *MIN_SEVERITY.get_or_init(|| {
        std::env::var(LOG_LEVEL_ENV)
            .ok()
            .and_then(|v| Severity::parse(&v))
            .unwrap_or(Severity::Info)
    })
}

/// Output stream for a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

static ROUTINE_TO_STDERR: AtomicBool = AtomicBool::new(false);

fn stream_for(severity: Severity, routine: LogStream) -> LogStream {
    if severity >= Severity::Error {
        LogStream::Stderr
    } else {
        routine
    }
}

/// Structured logger writing JSON lines
pub struct Logger;

impl Logger {
    /// Log an event with the given severity and fields
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if severity < min_severity() {
            return;
        }
        match stream_for(severity, Self::routine_stream()) {
            LogStream::Stderr => Self::log_to_writer(severity, event, fields, &mut io::stderr()),
            LogStream::Stdout => Self::log_to_writer(severity, event, fields, &mut io::stdout()),
        }
    }

    /// Route TRACE/INFO/WARN lines. Commands that answer on stdout move
    /// them to stderr.
    pub fn set_routine_stream(stream: LogStream) {
        ROUTINE_TO_STDERR.store(stream == LogStream::Stderr, Ordering::Relaxed);
    }

    pub fn routine_stream() -> LogStream {
        if ROUTINE_TO_STDERR.load(Ordering::Relaxed) {
            LogStream::Stderr
        } else {
            LogStream::Stdout
        }
    }

    fn log_to_writer<W: Write>(
        severity: Severity,
        event: &str,
        fields: &[(&str, &str)],
        writer: &mut W,
    ) {
        let line = Self::format_line(severity, event, fields);
        // Logging never fails the caller
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }

    fn format_line(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut output = String::with_capacity(128);

        output.push_str("{\"event\":\"");
        escape_json_string(&mut output, event);
        output.push_str("\",\"severity\":\"");
        output.push_str(severity.as_str());
        output.push_str("\",\"target\":\"");
        output.push_str(LOG_TARGET);
        output.push('"');

        let mut sorted: Vec<_> = fields.iter().collect();
        sorted.sort_by_key(|(k, _)| *k);

        for (key, value) in sorted {
            output.push_str(",\"");
            escape_json_string(&mut output, key);
            output.push_str("\":\"");
            escape_json_string(&mut output, value);
            output.push('"');
        }

        output.push_str("}\n");
        output
    }

    pub fn trace(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Trace, event, fields);
    }

    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }

    pub fn fatal(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Fatal, event, fields);
    }
}

fn escape_json_string(output: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            c if c.is_control() => output.push_str(&format!("\\u{:04x}", c as u32)),
            c => output.push(c),
        }
    }
}

/// Capture logs to a buffer for testing
#[cfg(test)]
pub fn capture_log(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let mut buffer = Vec::new();
    Logger::log_to_writer(severity, event, fields, &mut buffer);
    String::from_utf8(buffer).unwrap()
}
