//! Password hashing and strength validation.
//!
//! Hashing uses the same derive-with-salt pattern as encryption, but the
//! derived material is a digest compared for equality rather than a
//! cipher key. The salt is embedded in the stored blob.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::cipher::EncryptionService;
use super::key::{derive_key, KEY_LENGTH, SALT_LENGTH};
use crate::error::{DoormanError, Result};

/// Minimum password length in characters.
const MIN_PASSWORD_LENGTH: usize = 8;

impl EncryptionService {
    /// Hash a password into a self-describing blob.
    ///
    /// # Returns
    ///
    /// `base64(salt || digest)`, safe to store as plain text.
    pub fn hash_password(&self, password: &str) -> Result<String> {
        if password.is_empty() {
            return Err(DoormanError::Encryption(
                "password cannot be empty".to_string(),
            ));
        }

        let (key, salt) = self.derive_key(password, None)?;

        let mut blob = Vec::with_capacity(SALT_LENGTH + KEY_LENGTH);
        blob.extend_from_slice(&salt);
        blob.extend_from_slice(key.as_bytes());

        Ok(STANDARD.encode(blob))
    }

    /// Check a password against a blob from [`hash_password`](Self::hash_password).
    ///
    /// Returns `false` on mismatch and on malformed input; it never
    /// errors, so callers cannot distinguish a bad blob from a bad
    /// password.
    pub fn verify_password(&self, password: &str, blob: &str) -> bool {
        if password.is_empty() {
            return false;
        }

        let raw = match STANDARD.decode(blob) {
            Ok(raw) => raw,
            Err(_) => return false,
        };
        if raw.len() != SALT_LENGTH + KEY_LENGTH {
            return false;
        }

        let (salt, digest) = raw.split_at(SALT_LENGTH);
        match derive_key(password, salt) {
            Ok(key) => key.as_bytes()[..] == digest[..],
            Err(_) => false,
        }
    }
}

/// Validate password strength for registration.
///
/// # Requirements
///
/// - At least 8 characters long
/// - Contains an uppercase letter, a lowercase letter, a digit, and a
///   non-alphanumeric character
///
/// # Returns
///
/// Returns `Ok(())` if acceptable, or `DoormanError::InvalidInput` with
/// the unmet requirement.
pub fn validate_password_strength(password: &str) -> Result<()> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(DoormanError::InvalidInput(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| !c.is_alphanumeric());

    if !(has_upper && has_lower && has_digit && has_symbol) {
        return Err(DoormanError::InvalidInput(
            "password must mix uppercase, lowercase, digits, and symbols".to_string(),
        ));
    }

    Ok(())
}
