//! keyguard - backup and recovery of device identity keys
//!
//! Keeps a checksummed copy of the device's live key blob on a secondary
//! medium, restores the live slot from it when the keys go bad, and watches
//! cloud connectivity for the failure pattern that signals bad keys.

pub mod backend;
pub mod cli;
pub mod config;
pub mod crash_point;
pub mod keyslot;
pub mod monitor;
pub mod observability;
pub mod platform;
pub mod reconcile;
pub mod record;
