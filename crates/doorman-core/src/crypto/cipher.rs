//! Authenticated encryption service.
//!
//! Encrypts arbitrary serializable values under a password-derived key
//! using AES-256-GCM. The output is a single opaque base64 string laid
//! out as `salt || nonce || ciphertext+tag`, so the blob carries
//! everything needed to rederive the key and verify integrity.
//!
//! Encryption is never deterministic: every call draws a fresh salt and
//! a fresh nonce, so encrypting the same value twice yields different
//! blobs.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::key::{derive_key, DerivedKey, SALT_LENGTH};
use super::random::{OsRandom, SharedRandom};
use crate::error::{DoormanError, Result};

/// AES-GCM nonce length in bytes (96 bits, the standard size).
pub const NONCE_LENGTH: usize = 12;

/// AES-GCM authentication tag length in bytes.
const TAG_LENGTH: usize = 16;

/// Minimum length of a well-formed blob: salt + nonce + tag of an empty
/// plaintext.
const MIN_BLOB_LENGTH: usize = SALT_LENGTH + NONCE_LENGTH + TAG_LENGTH;

/// Authenticated encryption over password-derived keys.
///
/// Holds only the injected random source; keys are derived from scratch
/// on every call and discarded immediately after use.
#[derive(Clone)]
pub struct EncryptionService {
    rng: SharedRandom,
}

impl Default for EncryptionService {
    fn default() -> Self {
        Self::new()
    }
}

impl EncryptionService {
    /// Create a service backed by the operating-system random source.
    pub fn new() -> Self {
        Self {
            rng: Arc::new(OsRandom),
        }
    }

    /// Create a service with an explicit random source.
    pub fn with_random(rng: SharedRandom) -> Self {
        Self { rng }
    }

    /// Derive a symmetric key from `secret`.
    ///
    /// If `salt` is omitted a fresh random salt is generated. Returns
    /// the key together with the salt so the caller can store the salt
    /// alongside the ciphertext.
    pub fn derive_key(&self, secret: &str, salt: Option<&[u8]>) -> Result<(DerivedKey, Vec<u8>)> {
        let salt = match salt {
            Some(salt) => salt.to_vec(),
            None => self.random_bytes(SALT_LENGTH)?,
        };
        let key = derive_key(secret, &salt)?;
        Ok((key, salt))
    }

    /// Encrypt a serializable value under `secret`.
    ///
    /// # Returns
    ///
    /// An opaque base64 blob containing `salt || nonce || ciphertext+tag`.
    ///
    /// # Errors
    ///
    /// Returns `DoormanError::Encryption` if `secret` is empty, the
    /// value cannot be serialized, or the cipher fails.
    pub fn encrypt<T: Serialize>(&self, value: &T, secret: &str) -> Result<String> {
        if secret.is_empty() {
            return Err(DoormanError::Encryption(
                "secret cannot be empty".to_string(),
            ));
        }

        let plaintext = serde_json::to_vec(value)
            .map_err(|_| DoormanError::Encryption("serialization failed".to_string()))?;

        let (key, salt) = self.derive_key(secret, None)?;
        let nonce_bytes = self.random_bytes(NONCE_LENGTH)?;

        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|_| DoormanError::Encryption("cipher setup failed".to_string()))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_ref())
            .map_err(|_| DoormanError::Encryption("encryption failed".to_string()))?;

        let mut blob = Vec::with_capacity(salt.len() + nonce_bytes.len() + ciphertext.len());
        blob.extend_from_slice(&salt);
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);

        Ok(STANDARD.encode(blob))
    }

    /// Decrypt a blob produced by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// Returns `DoormanError::Encryption` if the secret is wrong, the
    /// blob was truncated or corrupted, or the authentication tag does
    /// not verify. No partial value is ever returned on failure.
    pub fn decrypt<T: DeserializeOwned>(&self, blob: &str, secret: &str) -> Result<T> {
        if secret.is_empty() {
            return Err(DoormanError::Encryption(
                "secret cannot be empty".to_string(),
            ));
        }

        let raw = STANDARD
            .decode(blob)
            .map_err(|_| DoormanError::Encryption("malformed blob".to_string()))?;

        if raw.len() < MIN_BLOB_LENGTH {
            return Err(DoormanError::Encryption("malformed blob".to_string()));
        }

        let (salt, rest) = raw.split_at(SALT_LENGTH);
        let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LENGTH);

        let key = derive_key(secret, salt)?;
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|_| DoormanError::Encryption("cipher setup failed".to_string()))?;

        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| DoormanError::Encryption("decryption failed".to_string()))?;

        serde_json::from_slice(&plaintext)
            .map_err(|_| DoormanError::Encryption("decryption failed".to_string()))
    }

    /// Generate a random token of `len` bytes, hex-encoded.
    pub fn generate_token(&self, len: usize) -> Result<String> {
        let bytes = self.random_bytes(len)?;
        Ok(hex::encode(bytes))
    }

    /// Generate a random version-4 UUID from the injected source.
    pub fn generate_uuid(&self) -> Result<Uuid> {
        let mut bytes = [0u8; 16];
        self.rng.fill_bytes(&mut bytes)?;
        Ok(uuid::Builder::from_random_bytes(bytes).into_uuid())
    }

    fn random_bytes(&self, len: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; len];
        self.rng.fill_bytes(&mut bytes)?;
        Ok(bytes)
    }
}
