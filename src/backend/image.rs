//! Fixed-offset record storage on byte-addressable media
//!
//! Models EEPROM, FRAM and battery-backed RAM: the record occupies
//! `record_size(key_size)` bytes starting at a configured offset, and a load
//! always returns whatever bytes are there. An erased or never-written
//! region decodes into an invalid record, not a load failure.

use std::fs::OpenOptions;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::crash_point::{maybe_crash, points};
use crate::record::{record_size, BackupRecord};

use super::errors::{BackendError, BackendResult};
use super::BackupBackend;

/// Value of an erased EEPROM/flash cell.
const ERASED: u8 = 0xFF;

/// Random-access byte storage with a fixed capacity.
pub trait ByteMedium {
    /// Total addressable bytes
    fn capacity(&self) -> usize;

    /// Fill `buf` from `offset`
    fn read_at(&mut self, offset: usize, buf: &mut [u8]) -> io::Result<()>;

    /// Write `data` at `offset`
    fn write_at(&mut self, offset: usize, data: &[u8]) -> io::Result<()>;
}

/// In-memory medium, erased to 0xFF on creation.
#[derive(Debug, Clone)]
pub struct MemoryMedium {
    bytes: Vec<u8>,
}

impl MemoryMedium {
    /// Create an erased medium of `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![ERASED; capacity],
        }
    }

    /// Wrap existing contents
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl ByteMedium for MemoryMedium {
    fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn read_at(&mut self, offset: usize, buf: &mut [u8]) -> io::Result<()> {
        let end = offset
            .checked_add(buf.len())
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "read past end of medium"))?;
        buf.copy_from_slice(&self.bytes[offset..end]);
        Ok(())
    }

    fn write_at(&mut self, offset: usize, data: &[u8]) -> io::Result<()> {
        let end = offset
            .checked_add(data.len())
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| io::Error::new(io::ErrorKind::WriteZero, "write past end of medium"))?;
        self.bytes[offset..end].copy_from_slice(data);
        Ok(())
    }
}

/// Medium image kept in a host file (EEPROM dump, FRAM image, mtd device).
///
/// Bytes beyond the current end of file read as erased. Writes create the
/// file if needed and are fsynced before returning.
#[derive(Debug, Clone)]
pub struct FileMedium {
    path: PathBuf,
    capacity: usize,
}

impl FileMedium {
    pub fn new(path: impl AsRef<Path>, capacity: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            capacity,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteMedium for FileMedium {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn read_at(&mut self, offset: usize, buf: &mut [u8]) -> io::Result<()> {
        let mut file = OpenOptions::new().read(true).open(&self.path)?;
        file.seek(SeekFrom::Start(offset as u64))?;

        let mut filled = 0;
        while filled < buf.len() {
            let n = file.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf[filled..].fill(ERASED);
        Ok(())
    }

    fn write_at(&mut self, offset: usize, data: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;

        let len = file.metadata()?.len() as usize;
        if len < offset {
            file.seek(SeekFrom::End(0))?;
            file.write_all(&vec![ERASED; offset - len])?;
        }

        file.seek(SeekFrom::Start(offset as u64))?;
        file.write_all(data)?;
        file.sync_all()
    }
}

/// Stores the record at a fixed offset of a [`ByteMedium`].
#[derive(Debug, Clone)]
pub struct ImageBackend<M> {
    medium: M,
    offset: usize,
    key_size: usize,
}

impl<M: ByteMedium> ImageBackend<M> {
    pub fn new(medium: M, offset: usize, key_size: usize) -> Self {
        Self {
            medium,
            offset,
            key_size,
        }
    }

    pub fn medium(&self) -> &M {
        &self.medium
    }

    pub fn medium_mut(&mut self) -> &mut M {
        &mut self.medium
    }

    pub fn into_medium(self) -> M {
        self.medium
    }

    fn check_bounds(&self) -> BackendResult<()> {
        let len = record_size(self.key_size);
        let capacity = self.medium.capacity();
        match self.offset.checked_add(len) {
            Some(end) if end <= capacity => Ok(()),
            _ => Err(BackendError::OutOfBounds {
                offset: self.offset,
                len,
                capacity,
            }),
        }
    }
}

impl<M: ByteMedium> BackupBackend for ImageBackend<M> {
    fn load(&mut self) -> BackendResult<BackupRecord> {
        self.check_bounds()?;

        let mut buf = vec![0u8; record_size(self.key_size)];
        self.medium
            .read_at(self.offset, &mut buf)
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => BackendError::Unavailable(e.to_string()),
                _ => BackendError::io("load", e),
            })?;

        BackupRecord::decode(&buf, self.key_size).map_err(|_| BackendError::ShortRead {
            expected: record_size(self.key_size),
            actual: buf.len(),
        })
    }

    fn save(&mut self, record: &BackupRecord) -> BackendResult<()> {
        self.check_bounds()?;

        let bytes = record.encode();
        if bytes.len() != record_size(self.key_size) {
            return Err(BackendError::ShortRead {
                expected: record_size(self.key_size),
                actual: bytes.len(),
            });
        }

        self.medium
            .write_at(self.offset, &bytes)
            .map_err(|e| BackendError::io("save", e))?;
        maybe_crash(points::BACKEND_AFTER_WRITE);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("image@{}", self.offset)
    }
}
