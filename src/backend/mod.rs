//! Backup medium subsystem for keyguard
//!
//! A backend persists exactly one [`BackupRecord`] and can hand it back.
//! Each storage medium gets its own implementation, chosen by the integrator
//! at construction time:
//!
//! - [`ImageBackend`] over a [`ByteMedium`]: EEPROM, FRAM, battery-backed RAM,
//!   or a raw image file. The record lives at a fixed byte offset.
//! - [`FileBackend`]: a file on a flash file system or SD card.
//!
//! # Contract
//!
//! - `load` returns a full record or an error; it never returns partial data
//! - `save` is all-or-nothing from the caller's point of view
//! - Header validation is the caller's job, not the backend's

mod errors;
mod file;
mod image;

pub use errors::{BackendError, BackendResult};
pub use file::FileBackend;
pub use image::{ByteMedium, FileMedium, ImageBackend, MemoryMedium};

use crate::record::BackupRecord;

/// Load/save capability over a single backup record.
pub trait BackupBackend {
    /// Read the stored record.
    fn load(&mut self) -> BackendResult<BackupRecord>;

    /// Replace the stored record.
    fn save(&mut self, record: &BackupRecord) -> BackendResult<()>;

    /// Short medium name for logs.
    fn describe(&self) -> String {
        "backend".to_string()
    }
}

impl<B: BackupBackend + ?Sized> BackupBackend for Box<B> {
    fn load(&mut self) -> BackendResult<BackupRecord> {
        (**self).load()
    }

    fn save(&mut self, record: &BackupRecord) -> BackendResult<()> {
        (**self).save(record)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<B: BackupBackend + ?Sized> BackupBackend for &mut B {
    fn load(&mut self) -> BackendResult<BackupRecord> {
        (**self).load()
    }

    fn save(&mut self, record: &BackupRecord) -> BackendResult<()> {
        (**self).save(record)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
