use super::cipher::Cipher;
use super::KvStore;
use crate::config::SaveConfig;
use crate::save::{SaveCategory, SaveError, StorageKey};

/// Encrypt-at-rest wrapper over a byte store.
///
/// `get` distinguishes "never written" (`Ok(None)`) from "written but
/// unreadable" (`Err(SaveError::Decryption)`).
#[derive(Debug)]
pub struct EncryptedStore<S: KvStore> {
    inner: S,
    cipher: Cipher,
    compress: bool,
}

impl<S: KvStore> EncryptedStore<S> {
    pub fn new(inner: S, config: &SaveConfig) -> Self {
        let cipher =
            if config.trusted_mode { Cipher::passthrough() } else { Cipher::new(&config.local_secret) };
        Self::with_cipher(inner, cipher, config.compress_local)
    }

    pub fn with_cipher(inner: S, cipher: Cipher, compress: bool) -> Self {
        Self { inner, cipher, compress }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    pub fn put(&mut self, key: &StorageKey, plaintext: &[u8]) -> Result<(), SaveError> {
        let sealed = self.cipher.seal(plaintext, self.compress)?;
        self.inner.put(&key.as_key(), &sealed)
    }

    pub fn get(&self, key: &StorageKey) -> Result<Option<Vec<u8>>, SaveError> {
        match self.inner.get(&key.as_key())? {
            Some(sealed) => self.cipher.open(&sealed).map(Some),
            None => Ok(None),
        }
    }

    pub fn put_string(&mut self, key: &StorageKey, json: &str) -> Result<(), SaveError> {
        self.put(key, json.as_bytes())
    }

    pub fn get_string(&self, key: &StorageKey) -> Result<Option<String>, SaveError> {
        match self.get(key)? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| SaveError::Decryption { reason: "payload is not UTF-8".to_string() }),
            None => Ok(None),
        }
    }

    pub fn remove(&mut self, key: &StorageKey) -> Result<bool, SaveError> {
        self.inner.remove(&key.as_key())
    }

    pub fn contains(&self, key: &StorageKey) -> Result<bool, SaveError> {
        Ok(self.inner.get(&key.as_key())?.is_some())
    }

    /// Delete the user's session blobs in every slot but `keep_slot`
    /// (every slot when `None`).
    ///
    /// Returns the slots that actually held data.
    pub fn clear_other_sessions(
        &mut self,
        username: &str,
        keep_slot: Option<u8>,
        slot_count: u8,
    ) -> Result<Vec<u8>, SaveError> {
        let mut cleared = Vec::new();
        for slot in (0..slot_count).filter(|&s| Some(s) != keep_slot) {
            if self.remove(&StorageKey::session(slot, username))? {
                cleared.push(slot);
            }
        }
        Ok(cleared)
    }

    /// Slots that currently hold a session blob for the user.
    pub fn session_slots(&self, username: &str, slot_count: u8) -> Result<Vec<u8>, SaveError> {
        let keys = self.inner.keys()?;
        Ok((0..slot_count)
            .filter(|&slot| keys.contains(&StorageKey::session(slot, username).as_key()))
            .collect())
    }

    /// Categories with a blob stored for the user (session slot 0 only).
    pub fn stored_categories(&self, username: &str) -> Result<Vec<SaveCategory>, SaveError> {
        let keys = self.inner.keys()?;
        Ok(SaveCategory::ALL
            .into_iter()
            .filter(|&c| keys.contains(&StorageKey::new(c, username).as_key()))
            .collect())
    }
}
