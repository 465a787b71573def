//! Storage abstraction for Doorman.
//!
//! This module defines the `KeyValueStore` trait the core persists
//! through, the fixed set of logical keys it owns, and the encrypting
//! `SecureStorage` wrapper that sits between the session layer and the
//! backing stores.
//!
//! ## Architecture
//!
//! Two stores back the core: a durable one (survives restarts) and a
//! session-scoped one (dies with the browsing session). Both are plain
//! string stores; every sensitive value is encrypted by `SecureStorage`
//! before it is written.
//!
//! ## Security
//!
//! The wrapper is responsible for:
//! - Encryption at rest under the configured storage secret
//! - Purging entries that no longer decrypt (self-healing reads)
//! - Clearing every owned key on logout

pub mod keys;
pub mod memory;
pub mod secure;
pub mod traits;

// Re-export public types
pub use keys::{StorageKey, LEGACY_AUTH_FLAG};
pub use memory::MemoryStore;
pub use secure::SecureStorage;
pub use traits::{KeyValueStore, SharedStore};
