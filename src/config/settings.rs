//! keyguard configuration file

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::{BackupBackend, FileBackend, FileMedium, ImageBackend};
use crate::keyslot::{FileKeySlot, KeyLayout, Transport};
use crate::monitor::{MonitorPolicy, RejectionCodes, DEFAULT_FAILURE_THRESHOLD};
use crate::reconcile::{ReconcilePolicy, DEFAULT_COOLDOWN, DEFAULT_RESTORE_ATTEMPTS};
use crate::record::record_size;

use super::errors::{ConfigError, ConfigResult};

/// Where the live key blob sits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveSlotConfig {
    pub path: PathBuf,

    /// Byte offset of the key blob within the file (default: 0)
    #[serde(default)]
    pub offset: u64,
}

/// Backup medium selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// One file holding exactly one record, replaced atomically
    File { path: PathBuf },
    /// Fixed-size image (raw EEPROM dump or similar) with the record at `offset`
    Image {
        path: PathBuf,
        #[serde(default)]
        offset: usize,
        capacity: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyguardConfig {
    /// Transport deciding the key layout (required unless `key_size` is set)
    #[serde(default)]
    pub transport: Option<Transport>,

    /// Opaque key blob size, overriding the transport layout
    #[serde(default)]
    pub key_size: Option<usize>,

    pub live_slot: LiveSlotConfig,

    pub backend: BackendConfig,

    /// Pause before restart after a restore (default: 5000)
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Write + verify rounds per restore (default: 3)
    #[serde(default = "default_restore_attempts")]
    pub restore_attempts: u32,

    /// Consecutive failed connections before a check (default: 3)
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: usize,

    /// Connection error codes meaning "keys rejected" (default: none)
    #[serde(default)]
    pub rejection_codes: RejectionCodes,
}

fn default_cooldown_ms() -> u64 {
    DEFAULT_COOLDOWN.as_millis() as u64
}

fn default_restore_attempts() -> u32 {
    DEFAULT_RESTORE_ATTEMPTS
}

fn default_failure_threshold() -> usize {
    DEFAULT_FAILURE_THRESHOLD
}

impl KeyguardConfig {
    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::read_failed(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: KeyguardConfig = serde_json::from_str(content)
            .map_err(|e| ConfigError::parse_failed(format!("invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let layout = self.layout()?;
        if layout.key_size() == 0 {
            return Err(ConfigError::invalid("key_size must be > 0"));
        }

        if self.restore_attempts == 0 {
            return Err(ConfigError::invalid("restore_attempts must be >= 1"));
        }
        if self.failure_threshold == 0 {
            return Err(ConfigError::invalid("failure_threshold must be >= 1"));
        }
        if self.live_slot.path.as_os_str().is_empty() {
            return Err(ConfigError::invalid("live_slot.path is empty"));
        }

        match &self.backend {
            BackendConfig::File { path } if path.as_os_str().is_empty() => {
                Err(ConfigError::invalid("backend.path is empty"))
            }
            BackendConfig::Image {
                path,
                offset,
                capacity,
            } => {
                if path.as_os_str().is_empty() {
                    return Err(ConfigError::invalid("backend.path is empty"));
                }
                let needed = offset.saturating_add(record_size(layout.key_size()));
                if needed > *capacity {
                    return Err(ConfigError::invalid(format!(
                        "backend image of {} bytes cannot hold a {}-byte record at offset {}",
                        capacity,
                        record_size(layout.key_size()),
                        offset
                    )));
                }
                Ok(())
            }
            BackendConfig::File { .. } => Ok(()),
        }
    }

    pub fn layout(&self) -> ConfigResult<KeyLayout> {
        match (self.key_size, self.transport) {
            (Some(size), _) => {
                KeyLayout::opaque(size).map_err(|e| ConfigError::invalid(e.to_string()))
            }
            (None, Some(transport)) => Ok(KeyLayout::for_transport(transport)),
            (None, None) => Err(ConfigError::invalid(
                "one of transport or key_size must be set",
            )),
        }
    }

    pub fn reconcile_policy(&self) -> ReconcilePolicy {
        ReconcilePolicy {
            cooldown: Duration::from_millis(self.cooldown_ms),
            restore_attempts: self.restore_attempts,
        }
    }

    pub fn monitor_policy(&self) -> MonitorPolicy {
        MonitorPolicy {
            failure_threshold: self.failure_threshold,
            rejection_codes: self.rejection_codes.clone(),
            transport: self.transport,
        }
    }

    pub fn open_backend(&self) -> ConfigResult<Box<dyn BackupBackend>> {
        let key_size = self.layout()?.key_size();
        let backend: Box<dyn BackupBackend> = match &self.backend {
            BackendConfig::File { path } => Box::new(FileBackend::new(path, key_size)),
            BackendConfig::Image {
                path,
                offset,
                capacity,
            } => Box::new(ImageBackend::new(
                FileMedium::new(path, *capacity),
                *offset,
                key_size,
            )),
        };
        Ok(backend)
    }

    pub fn open_live_slot(&self) -> ConfigResult<FileKeySlot> {
        let key_size = self.layout()?.key_size();
        Ok(FileKeySlot::new(
            &self.live_slot.path,
            self.live_slot.offset,
            key_size,
        ))
    }
}
