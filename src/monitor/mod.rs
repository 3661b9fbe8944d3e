//! Connection failure monitor
//!
//! # Transitions
//!
//! | Event          | State           | Effect                                        |
//! |----------------|-----------------|-----------------------------------------------|
//! | `Connecting`   | any             | `connected = false`                           |
//! | `Connected`    | any             | `connected = true`, count reset, save-current |
//! | `Disconnected` | connected       | `connected = false`                           |
//! | `Disconnected` | not connected   | rejection code → check, else count++          |
//!
//! While the count is at or above the threshold, every failed attempt forces
//! the cloud link down and runs an automatic check. Only `Connected` resets
//! the count. A rejection code skips the count entirely.
//!
//! A dropped established session never counts: the keys were accepted.

mod event;
mod machine;
mod policy;

pub use event::{ConnectionEvent, EventFeed};
pub use machine::{FailureMonitor, MonitorAction, MonitorState, Trigger};
pub use policy::{MonitorPolicy, RejectionCode, RejectionCodes, DEFAULT_FAILURE_THRESHOLD};
