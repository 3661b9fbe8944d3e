//! Live key slot access for keyguard
//!
//! The live slot is where the device runtime reads its identity keys at
//! boot. keyguard only reads it, and writes it back during a restore.

mod errors;
mod file;
mod layout;

pub use errors::{KeySlotError, KeySlotResult};
pub use file::FileKeySlot;
pub use layout::{KeyLayout, Transport};

/// Raw access to the device's active key material.
pub trait LiveKeySlot {
    /// Read the full key blob (private key followed by public key).
    fn read_keys(&mut self) -> KeySlotResult<Vec<u8>>;

    /// Overwrite the full key blob.
    ///
    /// A success return is not trusted on its own; callers re-read to verify.
    fn write_keys(&mut self, keys: &[u8]) -> KeySlotResult<()>;
}

impl<S: LiveKeySlot + ?Sized> LiveKeySlot for &mut S {
    fn read_keys(&mut self) -> KeySlotResult<Vec<u8>> {
        (**self).read_keys()
    }

    fn write_keys(&mut self, keys: &[u8]) -> KeySlotResult<()> {
        (**self).write_keys(keys)
    }
}

impl<S: LiveKeySlot + ?Sized> LiveKeySlot for Box<S> {
    fn read_keys(&mut self) -> KeySlotResult<Vec<u8>> {
        (**self).read_keys()
    }

    fn write_keys(&mut self, keys: &[u8]) -> KeySlotResult<()> {
        (**self).write_keys(keys)
    }
}

/// Key slot held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryKeySlot {
    keys: Vec<u8>,
    writes: usize,
}

impl MemoryKeySlot {
    pub fn new(keys: Vec<u8>) -> Self {
        Self { keys, writes: 0 }
    }

    pub fn keys(&self) -> &[u8] {
        &self.keys
    }

    /// Number of successful `write_keys` calls
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl LiveKeySlot for MemoryKeySlot {
    fn read_keys(&mut self) -> KeySlotResult<Vec<u8>> {
        Ok(self.keys.clone())
    }

    fn write_keys(&mut self, keys: &[u8]) -> KeySlotResult<()> {
        if keys.len() != self.keys.len() {
            return Err(KeySlotError::Length {
                expected: self.keys.len(),
                actual: keys.len(),
            });
        }
        self.keys.copy_from_slice(keys);
        self.writes += 1;
        Ok(())
    }
}
