//! Cross-request forgery token management.
//!
//! One active token per browser session, kept only in the
//! session-scoped store. A candidate validates iff it exactly matches
//! the currently stored value; tokens from a previous generation never
//! validate.

use crate::crypto::EncryptionService;
use crate::error::Result;
use crate::storage::{SharedStore, StorageKey};

/// Length of the random token in bytes (hex-encoded for storage).
const TOKEN_LENGTH: usize = 32;

/// Issues and checks the per-session anti-forgery token.
#[derive(Clone)]
pub struct CsrfTokenManager {
    store: SharedStore,
    crypto: EncryptionService,
}

impl CsrfTokenManager {
    /// Create a manager over the session-scoped store.
    pub fn new(store: SharedStore, crypto: EncryptionService) -> Self {
        Self { store, crypto }
    }

    /// Generate a new token, replacing any previously stored one.
    ///
    /// Called exactly once per new session.
    pub fn generate_token(&self) -> Result<String> {
        let token = self.crypto.generate_token(TOKEN_LENGTH)?;
        self.store.set(StorageKey::Csrf.as_str(), &token)?;
        Ok(token)
    }

    /// Read the current token without side effects.
    pub fn get_token(&self) -> Option<String> {
        match self.store.get(StorageKey::Csrf.as_str()) {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!(error = %err, "csrf token read failed");
                None
            }
        }
    }

    /// True iff `candidate` is non-empty and matches the stored token.
    pub fn validate_token(&self, candidate: &str) -> bool {
        if candidate.is_empty() {
            return false;
        }
        match self.get_token() {
            Some(token) => token == candidate,
            None => false,
        }
    }

    /// Remove the stored token; validation fails until a new one is
    /// generated.
    pub fn clear_token(&self) {
        if let Err(err) = self.store.remove(StorageKey::Csrf.as_str()) {
            tracing::warn!(error = %err, "csrf token clear failed");
        }
    }
}
