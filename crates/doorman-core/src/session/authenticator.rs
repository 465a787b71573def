//! Credential verification collaborator.
//!
//! The session manager never checks passwords itself; it delegates to a
//! `CredentialAuthenticator`, which may be a remote identity service or
//! the local in-memory directory below. The transport is opaque to the
//! core.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::types::{Credentials, Registration, UserRecord};
use crate::crypto::EncryptionService;
use crate::error::{DoormanError, Result};

/// Length of issued access/refresh tokens in bytes.
const ISSUED_TOKEN_LENGTH: usize = 32;

/// A verified identity plus the token material issued for it.
#[derive(Clone)]
pub struct AuthenticatedUser {
    pub user: UserRecord,
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for AuthenticatedUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedUser")
            .field("user", &self.user)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// External credential verification.
#[async_trait]
pub trait CredentialAuthenticator: Send + Sync {
    /// Verify credentials and issue token material.
    ///
    /// # Errors
    ///
    /// Returns `DoormanError::InvalidCredentials` when the credentials
    /// are rejected.
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthenticatedUser>;

    /// Create an account and issue token material for it.
    async fn register_user(&self, registration: &Registration) -> Result<AuthenticatedUser>;
}

struct DirectoryAccount {
    password_hash: String,
    user: UserRecord,
}

/// In-memory account directory.
///
/// Reference authenticator for tests and local development: passwords
/// are stored as salted hashes, lookups are keyed by lowercased email.
pub struct DirectoryAuthenticator {
    crypto: EncryptionService,
    accounts: Mutex<HashMap<String, DirectoryAccount>>,
}

impl Default for DirectoryAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryAuthenticator {
    pub fn new() -> Self {
        Self {
            crypto: EncryptionService::new(),
            accounts: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DirectoryAccount>> {
        self.accounts.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("account directory mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Seed an account, replacing any existing one under the same email.
    pub fn add_account(&self, password: &str, user: UserRecord) -> Result<()> {
        let password_hash = self.crypto.hash_password(password)?;
        self.lock().insert(
            user.email.to_lowercase(),
            DirectoryAccount {
                password_hash,
                user,
            },
        );
        Ok(())
    }

    /// Builder-style variant of [`add_account`](Self::add_account).
    pub fn with_account(self, password: &str, user: UserRecord) -> Result<Self> {
        self.add_account(password, user)?;
        Ok(self)
    }

    fn issue(&self, user: UserRecord) -> Result<AuthenticatedUser> {
        Ok(AuthenticatedUser {
            user,
            access_token: self.crypto.generate_token(ISSUED_TOKEN_LENGTH)?,
            refresh_token: self.crypto.generate_token(ISSUED_TOKEN_LENGTH)?,
        })
    }
}

#[async_trait]
impl CredentialAuthenticator for DirectoryAuthenticator {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthenticatedUser> {
        let user = {
            let accounts = self.lock();
            match accounts.get(&credentials.email.to_lowercase()) {
                Some(account)
                    if self
                        .crypto
                        .verify_password(&credentials.password, &account.password_hash) =>
                {
                    account.user.clone()
                }
                _ => return Err(DoormanError::InvalidCredentials),
            }
        };

        self.issue(user)
    }

    async fn register_user(&self, registration: &Registration) -> Result<AuthenticatedUser> {
        let email_key = registration.email.to_lowercase();
        let password_hash = self.crypto.hash_password(&registration.password)?;

        let user = UserRecord {
            id: self.crypto.generate_uuid()?.to_string(),
            name: registration.name.clone(),
            email: registration.email.clone(),
            role: "member".to_string(),
            permissions: vec!["content.read".to_string()],
            avatar: None,
        };

        let mut accounts = self.lock();
        if accounts.contains_key(&email_key) {
            return Err(DoormanError::InvalidInput(
                "an account with this email already exists".to_string(),
            ));
        }
        accounts.insert(
            email_key,
            DirectoryAccount {
                password_hash,
                user: user.clone(),
            },
        );
        drop(accounts);

        self.issue(user)
    }
}
