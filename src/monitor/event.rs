//! Connectivity events delivered to the failure monitor

use std::fmt;

use serde::{Deserialize, Serialize};

/// Cloud connection signals the monitor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionEvent {
    /// A connection attempt has started
    Connecting,
    /// The cloud session is established
    Connected,
    /// The session dropped or the attempt failed
    Disconnected,
}

impl ConnectionEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionEvent::Connecting => "connecting",
            ConnectionEvent::Connected => "connected",
            ConnectionEvent::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for ConnectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Source of connection events for [`super::FailureMonitor::run`].
pub trait EventFeed {
    /// Next event, or `None` when the feed is exhausted.
    fn next_event(&mut self) -> Option<ConnectionEvent>;
}

impl<I> EventFeed for I
where
    I: Iterator<Item = ConnectionEvent>,
{
    fn next_event(&mut self) -> Option<ConnectionEvent> {
        self.next()
    }
}
