//! Cryptographic operations for Doorman.
//!
//! This module provides authenticated encryption, key derivation, and
//! password hashing using well-audited libraries:
//! - **AES-256-GCM**: authenticated encryption (confidentiality + tamper detection)
//! - **PBKDF2-HMAC-SHA256**: slow key derivation (100,000 iterations)
//!
//! ## Security Model
//!
//! - Every blob is self-describing: `salt || nonce || ciphertext+tag`
//! - Fresh salt and nonce per encryption; never deterministic
//! - Keys exist only transiently and are zeroized on drop
//! - Randomness is an injected capability, never an ambient global
//!
//! ## Threat Model
//!
//! We defend against:
//! - Theft of encrypted values at rest
//! - Offline brute-force attacks on the secret
//! - Tampering with stored ciphertext
//!
//! We do NOT defend against:
//! - A compromised host / keylogger
//! - Access to process memory while a key is live

pub mod cipher;
pub mod key;
pub mod password;
pub mod random;

pub use cipher::{EncryptionService, NONCE_LENGTH};
pub use key::{derive_key, DerivedKey, KEY_LENGTH, PBKDF2_ITERATIONS, SALT_LENGTH};
pub use password::validate_password_strength;
pub use random::{OsRandom, RandomSource, SharedRandom};
