// Key/value persistence
// Raw byte stores, the encrypted wrapper and the portable export format

pub mod cipher;
pub mod encrypted;
pub mod file;
pub mod portable;

pub use cipher::Cipher;
pub use encrypted::EncryptedStore;
pub use file::FileStore;

use crate::save::SaveError;
use std::collections::BTreeMap;

/// Byte-oriented key/value backend.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SaveError>;

    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), SaveError>;

    /// Returns whether the key existed.
    fn remove(&mut self, key: &str) -> Result<bool, SaveError>;

    fn keys(&self) -> Result<Vec<String>, SaveError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SaveError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), SaveError> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool, SaveError> {
        Ok(self.entries.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>, SaveError> {
        Ok(self.entries.keys().cloned().collect())
    }
}
