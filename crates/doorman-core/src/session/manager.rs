//! Session lifecycle orchestration.
//!
//! The manager composes the rate limiter, the CSRF token manager, and
//! the encrypting storage wrapper around an external credential
//! authenticator. It owns the two per-session timers (warning, expiry)
//! and guarantees they never outlive the session that armed them:
//! arming always cancels the previous pair, so a stale timer can never
//! fire into a newer session.
//!
//! Sessions have a hard absolute lifetime: activity refreshes persist
//! `last_activity` but never move `expires_at`.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::authenticator::{AuthenticatedUser, CredentialAuthenticator};
use super::types::{
    Credentials, LoginOutcome, Registration, RegistrationOutcome, SessionEvent, SessionRecord,
    TokenBundle, UserRecord,
};
use crate::clock::{SharedClock, SystemClock};
use crate::crypto::validate_password_strength;
use crate::csrf::CsrfTokenManager;
use crate::error::{DoormanError, Result};
use crate::ratelimit::RateLimiter;
use crate::storage::{SecureStorage, StorageKey, LEGACY_AUTH_FLAG};

/// Capacity of the lifecycle event channel.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Tunables for the session lifecycle.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Lifetime of a normal session.
    pub session_duration: Duration,
    /// Lifetime of a "remember me" session.
    pub remember_me_duration: Duration,
    /// How long before expiry the warning fires.
    pub expiry_warning_lead: Duration,
    /// Login attempts admitted per window.
    pub max_login_attempts: u32,
    /// Width of the login attempt window.
    pub login_attempt_window: Duration,
    /// Identifies this client for rate limiting and the session
    /// fingerprint.
    pub client_id: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_duration: Duration::from_secs(30 * 60),
            remember_me_duration: Duration::from_secs(30 * 24 * 60 * 60),
            expiry_warning_lead: Duration::from_secs(2 * 60),
            max_login_attempts: 5,
            login_attempt_window: Duration::from_secs(15 * 60),
            client_id: "local".to_string(),
        }
    }
}

struct SessionTimers {
    warning: JoinHandle<()>,
    expiry: JoinHandle<()>,
}

struct ManagerInner {
    config: SessionConfig,
    storage: SecureStorage,
    csrf: CsrfTokenManager,
    limiter: RateLimiter,
    authenticator: Arc<dyn CredentialAuthenticator>,
    clock: SharedClock,
    events: broadcast::Sender<SessionEvent>,
    timers: Mutex<Option<SessionTimers>>,
}

/// Orchestrates login, registration, logout, activity tracking, and
/// timed expiry of the authenticated session.
///
/// Cheap to clone; clones share the same session state and timers.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<ManagerInner>,
}

impl SessionManager {
    /// Create a manager over `storage` and an external authenticator,
    /// using the system clock.
    pub fn new(
        config: SessionConfig,
        storage: SecureStorage,
        authenticator: Arc<dyn CredentialAuthenticator>,
    ) -> Self {
        Self::with_clock(config, storage, authenticator, Arc::new(SystemClock))
    }

    /// Create a manager with an explicit clock.
    pub fn with_clock(
        config: SessionConfig,
        storage: SecureStorage,
        authenticator: Arc<dyn CredentialAuthenticator>,
        clock: SharedClock,
    ) -> Self {
        let csrf = CsrfTokenManager::new(storage.ephemeral_store().clone(), storage.crypto().clone());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(ManagerInner {
                config,
                storage,
                csrf,
                limiter: RateLimiter::new(),
                authenticator,
                clock,
                events,
                timers: Mutex::new(None),
            }),
        }
    }

    /// The CSRF token manager for this session.
    pub fn csrf(&self) -> &CsrfTokenManager {
        &self.inner.csrf
    }

    /// Subscribe to lifecycle signals (warning, expiry).
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Authenticate and establish a session.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` when email or password is missing
    /// - `RateLimited` when the attempt budget for this client is spent
    /// - `InvalidCredentials` when the authenticator rejects
    /// - `Storage` when the session could not be persisted
    pub async fn login(&self, credentials: &Credentials, remember_me: bool) -> Result<LoginOutcome> {
        if credentials.email.trim().is_empty() || credentials.password.is_empty() {
            return Err(DoormanError::InvalidInput(
                "email and password are required".to_string(),
            ));
        }

        let limiter_key = format!("login:{}", self.inner.config.client_id);
        if !self.inner.limiter.is_allowed(
            &limiter_key,
            self.inner.config.max_login_attempts,
            self.inner.config.login_attempt_window.as_millis() as u64,
            self.inner.clock.now_ms(),
        ) {
            return Err(DoormanError::RateLimited);
        }

        let auth = self.inner.authenticator.authenticate(credentials).await?;
        self.inner.limiter.reset(&limiter_key);

        let lifetime = if remember_me {
            self.inner.config.remember_me_duration
        } else {
            self.inner.config.session_duration
        };
        let record = self.inner.establish_session(auth, lifetime, remember_me)?;

        tracing::debug!(session_id = %record.session_id, remember_me, "session established");
        Ok(LoginOutcome {
            user: record.user,
            session_id: record.session_id,
        })
    }

    /// Validate and register a new account, then establish a session.
    ///
    /// All validation happens before the external registrar is
    /// contacted. Registration sessions always use the short duration.
    pub async fn register(&self, registration: &Registration) -> Result<RegistrationOutcome> {
        validate_registration(registration)?;

        let auth = self.inner.authenticator.register_user(registration).await?;
        let record =
            self.inner
                .establish_session(auth, self.inner.config.session_duration, false)?;

        tracing::debug!(session_id = %record.session_id, "session established for new account");
        Ok(RegistrationOutcome {
            user: record.user,
            message: "registration complete".to_string(),
        })
    }

    /// End the session: cancel timers, purge storage, drop the CSRF
    /// token. Idempotent: logging out while logged out is a no-op
    /// success.
    pub fn logout(&self) -> bool {
        self.inner.cancel_timers();
        self.inner.storage.clear();
        self.inner.csrf.clear_token();
        tracing::debug!("logged out");
        true
    }

    /// The current session, or `None` when anonymous or expired.
    ///
    /// Expiry is checked synchronously before anything else: an expired
    /// record triggers the same cleanup as logout plus an `Expired`
    /// signal. A live read bumps `last_activity` and re-persists the
    /// record; `expires_at` is never touched.
    pub fn get_current_session(&self) -> Option<SessionRecord> {
        let (mut record, ephemeral) = self.inner.load_record()?;

        let now = self.inner.clock.now();
        if record.is_expired(now) {
            self.inner.expire();
            return None;
        }

        record.last_activity = now;
        if !self
            .inner
            .storage
            .set_secure_item(StorageKey::Session, &record, ephemeral)
        {
            tracing::warn!("failed to persist activity refresh");
        }

        Some(record)
    }

    /// The current user, or `None` when anonymous or expired.
    pub fn get_current_user(&self) -> Option<UserRecord> {
        self.get_current_session().map(|record| record.user)
    }

    /// Whether a live session exists right now.
    pub fn is_authenticated(&self) -> bool {
        self.get_current_session().is_some()
    }
}

impl ManagerInner {
    fn timers_lock(&self) -> MutexGuard<'_, Option<SessionTimers>> {
        self.timers.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("timer mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Build, persist, and arm a fresh session for a verified identity.
    fn establish_session(
        self: &Arc<Self>,
        auth: AuthenticatedUser,
        lifetime: Duration,
        remember_me: bool,
    ) -> Result<SessionRecord> {
        let csrf_token = self.csrf.generate_token()?;

        let now = self.clock.now();
        let expires_at = now + chrono::Duration::milliseconds(lifetime.as_millis() as i64);

        let record = SessionRecord {
            session_id: self.storage.crypto().generate_uuid()?.to_string(),
            user_id: auth.user.id.clone(),
            access_token: auth.access_token.clone(),
            refresh_token: auth.refresh_token.clone(),
            csrf_token,
            created_at: now,
            expires_at,
            last_activity: now,
            client_fingerprint: self.config.client_id.clone(),
            user: auth.user,
        };

        // Remember-me sessions go to the durable store; everything else
        // dies with the browsing session.
        let ephemeral = !remember_me;
        let bundle = TokenBundle {
            access_token: auth.access_token,
            refresh_token: auth.refresh_token,
        };

        let persisted = self
            .storage
            .set_secure_item(StorageKey::Tokens, &bundle, ephemeral)
            && self
                .storage
                .set_secure_item(StorageKey::User, &record.user, ephemeral)
            && self
                .storage
                .set_secure_item(StorageKey::Session, &record, ephemeral);
        if !persisted {
            // Leave nothing half-written behind.
            self.storage.clear();
            self.csrf.clear_token();
            return Err(DoormanError::Storage(
                "session could not be persisted".to_string(),
            ));
        }

        if let Err(err) = self.storage.durable_store().set(LEGACY_AUTH_FLAG, "true") {
            tracing::warn!(error = %err, "legacy flag write failed");
        }

        self.arm_timers(expires_at);
        Ok(record)
    }

    /// Schedule the warning and expiry timers for `expires_at`,
    /// cancelling any previously armed pair first (login-over-login
    /// included).
    fn arm_timers(self: &Arc<Self>, expires_at: DateTime<Utc>) {
        self.cancel_timers();

        let until_expiry = (expires_at - self.clock.now())
            .to_std()
            .unwrap_or_default();
        let until_warning = until_expiry.saturating_sub(self.config.expiry_warning_lead);
        let warning_remaining = until_expiry - until_warning;

        // Timer tasks hold only weak references: a dropped manager
        // cannot be resurrected by its own timers.
        let weak = Arc::downgrade(self);

        let warning = tokio::spawn({
            let weak = Weak::clone(&weak);
            async move {
                tokio::time::sleep(until_warning).await;
                if let Some(inner) = weak.upgrade() {
                    let _ = inner.events.send(SessionEvent::ExpiryWarning {
                        remaining: warning_remaining,
                    });
                }
            }
        });

        let expiry = tokio::spawn(async move {
            tokio::time::sleep(until_expiry).await;
            if let Some(inner) = weak.upgrade() {
                inner.expire();
            }
        });

        *self.timers_lock() = Some(SessionTimers { warning, expiry });
    }

    fn cancel_timers(&self) {
        if let Some(timers) = self.timers_lock().take() {
            // Aborting the task we are currently running inside is fine:
            // the abort only takes effect at an await point and expiry
            // cleanup is fully synchronous.
            timers.warning.abort();
            timers.expiry.abort();
        }
    }

    /// Logout-equivalent cleanup plus the `Expired` signal.
    ///
    /// Runs to completion whether or not anyone is subscribed.
    fn expire(&self) {
        self.cancel_timers();
        self.storage.clear();
        self.csrf.clear_token();
        tracing::debug!("session expired");
        let _ = self.events.send(SessionEvent::Expired);
    }

    /// Find the persisted record and which store it lives in.
    fn load_record(&self) -> Option<(SessionRecord, bool)> {
        if let Some(record) = self.storage.get_secure_item(StorageKey::Session, true) {
            return Some((record, true));
        }
        self.storage
            .get_secure_item(StorageKey::Session, false)
            .map(|record| (record, false))
    }
}

fn validate_registration(registration: &Registration) -> Result<()> {
    if registration.name.trim().is_empty() {
        return Err(DoormanError::InvalidInput("name is required".to_string()));
    }
    if !is_valid_email(&registration.email) {
        return Err(DoormanError::InvalidInput(
            "email address is not valid".to_string(),
        ));
    }
    validate_password_strength(&registration.password)
}

/// Minimal structural check: one `@`, non-empty local part, and a
/// domain containing a dot.
fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}
