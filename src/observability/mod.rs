//! Observability subsystem for keyguard
//!
//! - Structured JSON logging of every decision path
//! - Monotonic counters
//! - Key fingerprints in place of key bytes
//!
//! Observability is read-only: nothing here changes what a check decides.

mod events;
mod fingerprint;
mod logger;
mod metrics;

pub use events::Event;
pub use fingerprint::fingerprint;
pub use logger::{LogStream, Logger, Severity, LOG_LEVEL_ENV, LOG_TARGET};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log an event at the given severity
pub fn log_event(severity: Severity, event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity, event.as_str(), fields);
}
