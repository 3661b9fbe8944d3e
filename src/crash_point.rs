//! Crash point injection for testing restore durability
//!
//! Setting `KEYGUARD_CRASH_POINT=<name>` makes the process abort the moment
//! execution reaches the named point. No cleanup, no unwinding.
//!
//! # Usage
//!
//! ```ignore
//! use keyguard::crash_point::{maybe_crash, points};
//!
//! maybe_crash(points::RESTORE_AFTER_LIVE_WRITE);
//! ```
//!
//! ```bash
//! KEYGUARD_CRASH_POINT=restore_after_live_write keyguard check --config keyguard.json
//! ```

use std::sync::OnceLock;

/// Environment variable naming the active crash point
pub const CRASH_POINT_ENV: &str = "KEYGUARD_CRASH_POINT";

static CRASH_POINT: OnceLock<Option<String>> = OnceLock::new();

#[inline]
fn get_crash_point() -> Option<&'static str> {
    CRASH_POINT
        .get_or_init(|| std::env::var(CRASH_POINT_ENV).ok())
        .as_deref()
}

/// Returns true if `KEYGUARD_CRASH_POINT` equals the given name.
#[inline]
pub fn crash_point_enabled(name: &str) -> bool {
    get_crash_point().map(|p| p == name).unwrap_or(false)
}

/// Abort the process if the named crash point is enabled.
#[inline]
pub fn maybe_crash(name: &str) {
    if crash_point_enabled(name) {
        eprintln!("[CRASH] Triggering crash at point: {}", name);
        std::process::abort();
    }
}

/// All defined crash point names
pub mod points {
    // Backup medium
    pub const BACKEND_AFTER_TEMP_WRITE: &str = "backend_after_temp_write";
    pub const BACKEND_AFTER_WRITE: &str = "backend_after_write";

    // Live slot restore
    pub const RESTORE_AFTER_LIVE_WRITE: &str = "restore_after_live_write";
    pub const RESTORE_BEFORE_RESTART: &str = "restore_before_restart";

    /// Get all crash point names
    pub fn all() -> &'static [&'static str] {
        &[
            BACKEND_AFTER_TEMP_WRITE,
            BACKEND_AFTER_WRITE,
            RESTORE_AFTER_LIVE_WRITE,
            RESTORE_BEFORE_RESTART,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crash_point_disabled_by_default() {
        assert!(!crash_point_enabled("test_point"));
    }

    #[test]
    fn test_all_crash_points_defined() {
        let all = points::all();
        assert_eq!(all.len(), 4);
        assert!(all.contains(&"backend_after_write"));
        assert!(all.contains(&"restore_after_live_write"));
    }

    #[test]
    fn test_crash_point_names_are_lowercase_with_underscores() {
        for point in points::all() {
            assert!(
                point.chars().all(|c| c.is_lowercase() || c == '_'),
                "Crash point '{}' should be lowercase with underscores",
                point
            );
        }
    }
}
