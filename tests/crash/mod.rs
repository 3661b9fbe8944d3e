//! Crash testing support for keyguard
//!
//! - Crash injection at named points via `KEYGUARD_CRASH_POINT`
//! - Subprocess management
//! - Post-crash state inspection through the file fixtures

pub mod harness;

pub use harness::*;
