//! # Doorman Core
//!
//! Client-side secure session and encrypted-storage core for a
//! membership site. The UI layer is an external collaborator: it calls
//! the operations exposed here and renders the results, nothing more.
//!
//! ## Architecture
//!
//! - **crypto**: password-derived keys, authenticated encryption,
//!   password hashing, injected randomness
//! - **storage**: key/value store abstraction plus the encrypting,
//!   self-healing `SecureStorage` wrapper
//! - **session**: login/register/logout lifecycle, activity tracking,
//!   warning + expiry timers
//! - **csrf**: per-session anti-forgery token
//! - **ratelimit**: sliding-window attempt throttle
//! - **clock**: injected time capability
//!
//! ## Security
//!
//! Everything persisted through `SecureStorage` is encrypted under a
//! configured secret (AES-256-GCM over PBKDF2-derived keys). Corrupted
//! or tampered entries are purged on read instead of surfacing garbage.
//! Rate limiting here is best-effort client hygiene; the backend is
//! expected to enforce its own budget.

pub mod clock;
pub mod crypto;
pub mod csrf;
pub mod error;
pub mod ratelimit;
pub mod session;
pub mod storage;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use crypto::EncryptionService;
pub use csrf::CsrfTokenManager;
pub use error::{DoormanError, Result};
pub use ratelimit::RateLimiter;
pub use session::{
    AuthenticatedUser, Credentials, CredentialAuthenticator, DirectoryAuthenticator, LoginOutcome,
    Registration, RegistrationOutcome, SessionConfig, SessionEvent, SessionManager, SessionRecord,
    TokenBundle, UserRecord,
};
pub use storage::{KeyValueStore, MemoryStore, SecureStorage, SharedStore, StorageKey};

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
