//! Subprocess harness for crash tests
//!
//! Runs the real `keyguard` binary against files in a temp directory,
//! optionally with `KEYGUARD_CRASH_POINT` set, and captures the outcome.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use serde_json::Value;

/// Offset of the key blob inside the key-store image
pub const SLOT_OFFSET: usize = 32;

/// Result of one binary execution
#[derive(Debug)]
pub struct CrashTestResult {
    /// Terminated by a signal (abort) rather than exiting
    pub crashed: bool,
    pub exit_status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CrashTestResult {
    /// Last JSON response printed on stdout
    pub fn response(&self) -> Value {
        let line = self
            .stdout
            .lines()
            .rev()
            .find(|l| l.starts_with("{\"data\"") || l.starts_with("{\"status\""))
            .unwrap_or_else(|| panic!("no response in stdout: {}", self.stdout));
        serde_json::from_str(line).unwrap()
    }

    pub fn outcome(&self) -> String {
        self.response()["data"]["report"]["outcome"]
            .as_str()
            .unwrap_or_default()
            .to_string()
    }
}

/// Files used by one crash scenario
pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub key_size: usize,
}

impl Fixture {
    pub fn new(key_size: usize) -> Self {
        let fixture = Self {
            dir: tempfile::TempDir::new().unwrap(),
            key_size,
        };
        let config = serde_json::json!({
            "key_size": key_size,
            "cooldown_ms": 0,
            "live_slot": {"path": fixture.store_path(), "offset": SLOT_OFFSET},
            "backend": {"kind": "file", "path": fixture.backup_path()},
        });
        fs::write(fixture.config_path(), config.to_string()).unwrap();
        fixture
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("keyguard.json")
    }

    pub fn store_path(&self) -> PathBuf {
        self.dir.path().join("store.bin")
    }

    pub fn backup_path(&self) -> PathBuf {
        self.dir.path().join("keys.bak")
    }

    pub fn temp_backup_path(&self) -> PathBuf {
        self.dir.path().join("keys.bak.tmp")
    }

    pub fn write_live(&self, byte: u8) {
        let mut image = vec![0u8; SLOT_OFFSET];
        image.extend(std::iter::repeat(byte).take(self.key_size));
        fs::write(self.store_path(), image).unwrap();
    }

    pub fn live(&self) -> Vec<u8> {
        fs::read(self.store_path()).unwrap()[SLOT_OFFSET..].to_vec()
    }

    /// Run `keyguard check --mode <mode>`
    pub fn check(&self, mode: &str, crash_point: Option<&str>) -> CrashTestResult {
        run_keyguard(
            &[
                "check",
                "--config",
                path_str(&self.config_path()),
                "--mode",
                mode,
            ],
            crash_point,
        )
    }
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

/// Execute the binary, with the crash point env var when given
pub fn run_keyguard(args: &[&str], crash_point: Option<&str>) -> CrashTestResult {
    run_keyguard_logged(args, crash_point, "fatal")
}

/// Execute the binary with an explicit `KEYGUARD_LOG_LEVEL`
pub fn run_keyguard_logged(args: &[&str], crash_point: Option<&str>, level: &str) -> CrashTestResult {
    let mut command = Command::new(env!("CARGO_BIN_EXE_keyguard"));
    command
        .args(args)
        .env("KEYGUARD_LOG_LEVEL", level)
        .env_remove("KEYGUARD_CRASH_POINT");
    if let Some(point) = crash_point {
        command.env("KEYGUARD_CRASH_POINT", point);
    }

    let output = command.output().unwrap();
    CrashTestResult {
        crashed: output.status.code().is_none(),
        exit_status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}
