//! Encrypting storage wrapper.
//!
//! Values are encrypted under a process-wide configured secret before
//! they touch either backing store, and decrypted on the way out. A
//! value that no longer decrypts (stale secret, corruption, tampering)
//! is treated as unrecoverable: it is deleted so it cannot permanently
//! block future reads.

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::keys::{StorageKey, LEGACY_AUTH_FLAG};
use super::traits::SharedStore;
use crate::crypto::EncryptionService;

/// Encrypt-on-write / decrypt-on-read wrapper over the durable and the
/// session-scoped store.
#[derive(Clone)]
pub struct SecureStorage {
    crypto: EncryptionService,
    secret: SecretString,
    durable: SharedStore,
    ephemeral: SharedStore,
}

impl SecureStorage {
    /// Create a wrapper over the two backing stores.
    ///
    /// `secret` is the process-wide storage secret; all values are
    /// encrypted under keys derived from it.
    pub fn new(
        crypto: EncryptionService,
        secret: SecretString,
        durable: SharedStore,
        ephemeral: SharedStore,
    ) -> Self {
        Self {
            crypto,
            secret,
            durable,
            ephemeral,
        }
    }

    pub(crate) fn crypto(&self) -> &EncryptionService {
        &self.crypto
    }

    pub(crate) fn ephemeral_store(&self) -> &SharedStore {
        &self.ephemeral
    }

    pub(crate) fn durable_store(&self) -> &SharedStore {
        &self.durable
    }

    fn store(&self, ephemeral: bool) -> &SharedStore {
        if ephemeral {
            &self.ephemeral
        } else {
            &self.durable
        }
    }

    /// Encrypt `value` and persist it under `key`.
    ///
    /// Returns `false` (never panics or errors) when encryption or the
    /// store write fails, so callers can degrade gracefully. The failure
    /// is logged without any secret material.
    pub fn set_secure_item<T: Serialize>(&self, key: StorageKey, value: &T, ephemeral: bool) -> bool {
        let blob = match self.crypto.encrypt(value, self.secret.expose_secret()) {
            Ok(blob) => blob,
            Err(err) => {
                tracing::warn!(key = key.as_str(), error = %err, "secure write failed to encrypt");
                return false;
            }
        };

        match self.store(ephemeral).set(key.as_str(), &blob) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(key = key.as_str(), error = %err, "secure write failed to persist");
                false
            }
        }
    }

    /// Read and decrypt the value under `key`.
    ///
    /// Absent keys return `None`. A present-but-undecryptable entry is
    /// deleted as a side effect (self-healing) and `None` is returned,
    /// so a poisoned entry never blocks future reads.
    pub fn get_secure_item<T: DeserializeOwned>(&self, key: StorageKey, ephemeral: bool) -> Option<T> {
        let store = self.store(ephemeral);

        let blob = match store.get(key.as_str()) {
            Ok(Some(blob)) => blob,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(key = key.as_str(), error = %err, "secure read failed, treating as absent");
                return None;
            }
        };

        match self.crypto.decrypt(&blob, self.secret.expose_secret()) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(key = key.as_str(), "purging undecryptable entry");
                if let Err(err) = store.remove(key.as_str()) {
                    tracing::warn!(key = key.as_str(), error = %err, "failed to purge entry");
                }
                None
            }
        }
    }

    /// Delete the value under `key`. Missing keys are fine.
    pub fn remove_secure_item(&self, key: StorageKey, ephemeral: bool) {
        if let Err(err) = self.store(ephemeral).remove(key.as_str()) {
            tracing::warn!(key = key.as_str(), error = %err, "secure remove failed");
        }
    }

    /// Delete every key this subsystem owns from both stores.
    ///
    /// Used only on logout or irrecoverable session error.
    pub fn clear(&self) {
        for store in [&self.durable, &self.ephemeral] {
            for key in StorageKey::OWNED {
                if let Err(err) = store.remove(key.as_str()) {
                    tracing::warn!(key = key.as_str(), error = %err, "clear failed for key");
                }
            }
            if let Err(err) = store.remove(LEGACY_AUTH_FLAG) {
                tracing::warn!(error = %err, "clear failed for legacy flag");
            }
        }
    }
}
