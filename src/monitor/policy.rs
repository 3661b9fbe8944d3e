//! Failure monitor tuning

use serde::{Deserialize, Serialize};

use crate::keyslot::Transport;

/// Consecutive failed connection attempts that trigger a key check.
pub const DEFAULT_FAILURE_THRESHOLD: usize = 3;

/// A connection error code meaning "server rejected the device keys".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionCode {
    pub transport: Transport,
    pub code: i32,
}

/// Error codes that identify rejected keys without waiting for repeated
/// failures. The values are platform specific and come from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RejectionCodes(Vec<RejectionCode>);

impl RejectionCodes {
    pub fn new(codes: Vec<RejectionCode>) -> Self {
        Self(codes)
    }

    pub fn with(mut self, transport: Transport, code: i32) -> Self {
        self.0.push(RejectionCode { transport, code });
        self
    }

    /// Transport whose rejection code equals `code`, if any. With an
    /// `active` transport, codes configured for other transports never match.
    pub fn matches(&self, code: i32, active: Option<Transport>) -> Option<Transport> {
        self.0
            .iter()
            .filter(|c| active.map_or(true, |t| t == c.transport))
            .find(|c| c.code == code)
            .map(|c| c.transport)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RejectionCode> {
        self.0.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorPolicy {
    pub failure_threshold: usize,
    pub rejection_codes: RejectionCodes,
    /// Transport the device connects over, when known
    pub transport: Option<Transport>,
}

impl Default for MonitorPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            rejection_codes: RejectionCodes::default(),
            transport: None,
        }
    }
}
