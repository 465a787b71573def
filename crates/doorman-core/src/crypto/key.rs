//! Key derivation using PBKDF2-HMAC-SHA256.
//!
//! This module stretches low-entropy secrets (passwords, configured
//! storage secrets) into 256-bit symmetric keys. The iteration count is
//! fixed and deliberately high so offline brute-force attacks against a
//! stolen blob stay expensive.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::ZeroizeOnDrop;

use crate::error::{DoormanError, Result};

/// PBKDF2 iteration count (fixed for all derivations).
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Length of the random salt in bytes.
pub const SALT_LENGTH: usize = 16;

/// Length of derived key material in bytes (32 bytes = 256 bits for AES-256).
pub const KEY_LENGTH: usize = 32;

/// A symmetric key derived from a secret.
///
/// Exists only transiently per encrypt/decrypt call and is never
/// persisted. Key material is zeroized from memory when dropped.
#[derive(Clone, ZeroizeOnDrop)]
pub struct DerivedKey {
    /// The raw key bytes (zeroized on drop)
    key: [u8; KEY_LENGTH],
}

impl DerivedKey {
    pub(crate) fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self { key: bytes }
    }

    /// Get a reference to the raw key bytes.
    ///
    /// # Security
    ///
    /// Avoid storing or logging this value. Use only for immediate
    /// cipher operations.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Derive a symmetric key from a secret and salt.
///
/// # Arguments
///
/// * `secret` - The secret to stretch
/// * `salt` - Random salt (must be stored alongside the ciphertext so
///   decryption can reconstruct the identical key)
///
/// # Returns
///
/// Returns a `DerivedKey` suitable for AES-256-GCM.
///
/// # Security
///
/// - Same secret + salt always produces the same key (deterministic)
/// - Different salt produces a different key
/// - 100,000 iterations of HMAC-SHA256 per derivation
pub fn derive_key(secret: &str, salt: &[u8]) -> Result<DerivedKey> {
    if secret.is_empty() {
        return Err(DoormanError::Encryption(
            "secret cannot be empty".to_string(),
        ));
    }

    if salt.len() < SALT_LENGTH {
        return Err(DoormanError::Encryption(format!(
            "salt must be at least {} bytes",
            SALT_LENGTH
        )));
    }

    let mut key_bytes = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key_bytes);

    Ok(DerivedKey::from_bytes(key_bytes))
}
