//! Blob envelope: `SDv1` magic, flags byte, then either
//! `nonce || AES-256-GCM ciphertext` or `payload || SHA-256(payload)`.

use crate::save::SaveError;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;

pub const MAGIC: &[u8; 4] = b"SDv1";

const FLAG_ENCRYPTED: u8 = 1;
const FLAG_COMPRESSED: u8 = 1 << 1;

const HEADER_LEN: usize = 5;
const NONCE_LEN: usize = 12;
const CHECKSUM_LEN: usize = 32;

/// Symmetric cipher keyed by an application secret, or a checksummed
/// passthrough for trusted/offline mode.
#[derive(Clone)]
pub struct Cipher {
    key: Option<[u8; 32]>,
}

impl fmt::Debug for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.key.is_some() { "aes-256-gcm" } else { "passthrough" };
        f.debug_struct("Cipher").field("mode", &mode).finish()
    }
}

impl Cipher {
    /// Key is SHA-256 of the secret.
    pub fn new(secret: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        Self { key: Some(hasher.finalize().into()) }
    }

    pub fn passthrough() -> Self {
        Self { key: None }
    }

    pub fn is_passthrough(&self) -> bool {
        self.key.is_none()
    }

    pub fn seal(&self, plaintext: &[u8], compress: bool) -> Result<Vec<u8>, SaveError> {
        let payload = if compress { compress_prepend_size(plaintext) } else { plaintext.to_vec() };

        let mut flags = 0;
        if compress {
            flags |= FLAG_COMPRESSED;
        }

        let mut out = Vec::with_capacity(HEADER_LEN + NONCE_LEN + payload.len() + CHECKSUM_LEN);
        out.extend_from_slice(MAGIC);

        match &self.key {
            Some(key) => {
                let cipher = Aes256Gcm::new_from_slice(key)
                    .map_err(|e| SaveError::Storage(format!("failed to create cipher: {e}")))?;
                let mut nonce_bytes = [0u8; NONCE_LEN];
                rand::thread_rng().fill_bytes(&mut nonce_bytes);
                let ciphertext = cipher
                    .encrypt(Nonce::from_slice(&nonce_bytes), payload.as_slice())
                    .map_err(|_| SaveError::Storage("encryption failed".to_string()))?;

                out.push(flags | FLAG_ENCRYPTED);
                out.extend_from_slice(&nonce_bytes);
                out.extend_from_slice(&ciphertext);
            }
            None => {
                out.push(flags);
                out.extend_from_slice(&payload);
                out.extend_from_slice(&Sha256::digest(&payload));
            }
        }
        Ok(out)
    }

    pub fn open(&self, envelope: &[u8]) -> Result<Vec<u8>, SaveError> {
        if envelope.len() < HEADER_LEN || &envelope[..4] != MAGIC {
            return Err(decryption("not a save envelope"));
        }
        let flags = envelope[4];
        let body = &envelope[HEADER_LEN..];
        let encrypted = flags & FLAG_ENCRYPTED != 0;

        let payload = match (&self.key, encrypted) {
            (Some(key), true) => {
                if body.len() < NONCE_LEN {
                    return Err(decryption("envelope truncated"));
                }
                let (nonce_bytes, ciphertext) = body.split_at(NONCE_LEN);
                let cipher = Aes256Gcm::new_from_slice(key)
                    .map_err(|e| SaveError::Storage(format!("failed to create cipher: {e}")))?;
                cipher
                    .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
                    .map_err(|_| decryption("wrong secret or corrupted data"))?
            }
            (None, false) => {
                if body.len() < CHECKSUM_LEN {
                    return Err(decryption("envelope truncated"));
                }
                let (payload, checksum) = body.split_at(body.len() - CHECKSUM_LEN);
                if Sha256::digest(payload).as_slice() != checksum {
                    return Err(decryption("checksum mismatch"));
                }
                payload.to_vec()
            }
            (Some(_), false) => return Err(decryption("blob is not encrypted but a secret is configured")),
            (None, true) => return Err(decryption("blob is encrypted but passthrough mode is active")),
        };

        if flags & FLAG_COMPRESSED != 0 {
            decompress_size_prepended(&payload).map_err(|_| decryption("decompression failed"))
        } else {
            Ok(payload)
        }
    }
}

fn decryption(reason: &str) -> SaveError {
    SaveError::Decryption { reason: reason.to_string() }
}
