//! Session lifecycle for Doorman.
//!
//! State machine: Anonymous → Authenticating → Authenticated → Warned →
//! Expired/LoggedOut. The manager serializes all session mutations
//! (every public method completes its read-modify-write of the session
//! record before returning) and owns the warning/expiry timer pair for
//! the active session.

pub mod authenticator;
pub mod manager;
pub mod types;

// Re-export public types
pub use authenticator::{AuthenticatedUser, CredentialAuthenticator, DirectoryAuthenticator};
pub use manager::{SessionConfig, SessionManager};
pub use types::{
    Credentials, LoginOutcome, Registration, RegistrationOutcome, SessionEvent, SessionRecord,
    TokenBundle, UserRecord,
};
