//! Whole-file record storage for flash file systems and SD cards
//!
//! The file holds exactly one encoded record. Replacement follows:
//! 1. Write `<name>.tmp` and fsync it
//! 2. Rename over `<name>`
//! 3. fsync the parent directory
//!
//! A reader therefore sees either the old or the new full record.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::crash_point::{maybe_crash, points};
use crate::record::{record_size, BackupRecord};

use super::errors::{BackendError, BackendResult};
use super::BackupBackend;

/// Backup record stored as a single file.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
    key_size: usize,
}

impl FileBackend {
    pub fn new(path: impl AsRef<Path>, key_size: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            key_size,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// fsync a directory
fn fsync_dir(dir: &Path) -> io::Result<()> {
    OpenOptions::new().read(true).open(dir)?.sync_all()
}

impl BackupBackend for FileBackend {
    fn load(&mut self) -> BackendResult<BackupRecord> {
        let mut file = File::open(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                BackendError::Unavailable(format!("{} does not exist", self.path.display()))
            }
            _ => BackendError::io("open", e),
        })?;

        let expected = record_size(self.key_size);
        let len = file
            .metadata()
            .map_err(|e| BackendError::io("stat", e))?
            .len() as usize;
        if len != expected {
            return Err(BackendError::ShortRead {
                expected,
                actual: len,
            });
        }

        let mut buf = Vec::with_capacity(expected);
        file.read_to_end(&mut buf)
            .map_err(|e| BackendError::io("load", e))?;

        BackupRecord::decode(&buf, self.key_size).map_err(|_| BackendError::ShortRead {
            expected,
            actual: buf.len(),
        })
    }

    fn save(&mut self, record: &BackupRecord) -> BackendResult<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !parent.is_dir() {
            return Err(BackendError::Unavailable(format!(
                "{} is not mounted",
                parent.display()
            )));
        }

        let temp = self.temp_path();
        {
            let mut file = File::create(&temp).map_err(|e| BackendError::io("create", e))?;
            file.write_all(&record.encode())
                .map_err(|e| BackendError::io("save", e))?;
            file.sync_all().map_err(|e| BackendError::io("fsync", e))?;
        }
        maybe_crash(points::BACKEND_AFTER_TEMP_WRITE);

        fs::rename(&temp, &self.path).map_err(|e| BackendError::io("rename", e))?;
        fsync_dir(&parent).map_err(|e| BackendError::io("fsync", e))?;
        maybe_crash(points::BACKEND_AFTER_WRITE);

        Ok(())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}
