//! Logical storage keys owned by this subsystem.

/// The fixed set of keys the secure storage layer owns.
///
/// Everything under these keys is written encrypted, except the CSRF
/// token (random, session-scoped, worthless at rest) and the legacy
/// flag below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKey {
    /// Access + refresh token bundle
    Tokens,
    /// User profile bundle
    User,
    /// Full session record
    Session,
    /// Anti-forgery token (session-scoped store only)
    Csrf,
}

impl StorageKey {
    /// Every key this subsystem owns, in no particular order.
    pub const OWNED: [StorageKey; 4] = [
        StorageKey::Tokens,
        StorageKey::User,
        StorageKey::Session,
        StorageKey::Csrf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::Tokens => "doorman.tokens",
            StorageKey::User => "doorman.user",
            StorageKey::Session => "doorman.session",
            StorageKey::Csrf => "doorman.csrf",
        }
    }
}

/// Plain (unencrypted) flag older site code keys off to decide whether a
/// login banner is shown. Carried for compatibility; excluded from the
/// encryption guarantees.
pub const LEGACY_AUTH_FLAG: &str = "doorman.authenticated";
