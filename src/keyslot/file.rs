//! Live key slot backed by a key-store image file
//!
//! On host builds the device configuration table is an image file; the keys
//! occupy `key_size` bytes at a fixed offset within it.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::errors::{KeySlotError, KeySlotResult};
use super::LiveKeySlot;

#[derive(Debug, Clone)]
pub struct FileKeySlot {
    path: PathBuf,
    offset: u64,
    key_size: usize,
}

impl FileKeySlot {
    pub fn new(path: impl AsRef<Path>, offset: u64, key_size: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            offset,
            key_size,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LiveKeySlot for FileKeySlot {
    fn read_keys(&mut self) -> KeySlotResult<Vec<u8>> {
        let mut file = File::open(&self.path).map_err(|e| KeySlotError::io("open", e))?;
        file.seek(SeekFrom::Start(self.offset))
            .map_err(|e| KeySlotError::io("seek", e))?;

        let mut keys = Vec::with_capacity(self.key_size);
        file.take(self.key_size as u64)
            .read_to_end(&mut keys)
            .map_err(|e| KeySlotError::io("read", e))?;

        if keys.len() != self.key_size {
            return Err(KeySlotError::Length {
                expected: self.key_size,
                actual: keys.len(),
            });
        }
        Ok(keys)
    }

    fn write_keys(&mut self, keys: &[u8]) -> KeySlotResult<()> {
        if keys.len() != self.key_size {
            return Err(KeySlotError::Length {
                expected: self.key_size,
                actual: keys.len(),
            });
        }

        let mut file = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .map_err(|e| KeySlotError::io("open", e))?;
        file.seek(SeekFrom::Start(self.offset))
            .map_err(|e| KeySlotError::io("seek", e))?;
        file.write_all(keys)
            .map_err(|e| KeySlotError::io("write", e))?;
        file.sync_all().map_err(|e| KeySlotError::io("fsync", e))
    }
}
