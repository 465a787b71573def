//! Error types for Doorman core operations.
//!
//! This module defines the error hierarchy for all core operations.
//! Errors are descriptive at the core level; the UI layer maps these
//! to localized, user-friendly messages.

use thiserror::Error;

/// Result type alias for Doorman operations.
pub type Result<T> = std::result::Result<T, DoormanError>;

/// Core error type for Doorman operations.
#[derive(Debug, Error)]
pub enum DoormanError {
    /// Missing or malformed credentials or registration fields
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Attempt budget exceeded for the rate-limited operation
    #[error("Too many attempts, please try again later")]
    RateLimited,

    /// The credential authenticator rejected the credentials
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Key derivation, encryption, or decryption failure.
    ///
    /// Always reported as this single kind without algorithm-level
    /// detail, so failure messages leak nothing useful to an attacker.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Underlying key/value store inaccessible
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<getrandom::Error> for DoormanError {
    fn from(_: getrandom::Error) -> Self {
        DoormanError::Encryption("random source unavailable".to_string())
    }
}
