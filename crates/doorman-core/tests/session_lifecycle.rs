use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use secrecy::SecretString;

use doorman_core::storage::{StorageKey, LEGACY_AUTH_FLAG};
use doorman_core::{
    Credentials, DirectoryAuthenticator, DoormanError, EncryptionService, KeyValueStore,
    ManualClock, MemoryStore, Registration, SecureStorage, SessionConfig, SessionEvent,
    SessionManager, SharedStore, UserRecord,
};

struct Harness {
    manager: SessionManager,
    clock: Arc<ManualClock>,
    durable: Arc<MemoryStore>,
    ephemeral: Arc<MemoryStore>,
}

fn admin_user() -> UserRecord {
    UserRecord {
        id: "admin-1".to_string(),
        name: "Site Admin".to_string(),
        email: "admin@x".to_string(),
        role: "admin".to_string(),
        permissions: vec![
            "content.read".to_string(),
            "content.write".to_string(),
            "members.manage".to_string(),
        ],
        avatar: None,
    }
}

fn admin_credentials() -> Credentials {
    Credentials {
        email: "admin@x".to_string(),
        password: "Admin@123".to_string(),
    }
}

fn wrong_credentials() -> Credentials {
    Credentials {
        email: "admin@x".to_string(),
        password: "Wrong@123".to_string(),
    }
}

fn harness(config: SessionConfig) -> Harness {
    let clock = Arc::new(ManualClock::starting_at(Utc::now()));
    let durable = Arc::new(MemoryStore::new());
    let ephemeral = Arc::new(MemoryStore::new());

    let storage = SecureStorage::new(
        EncryptionService::new(),
        SecretString::from("lifecycle-test-secret".to_string()),
        durable.clone() as SharedStore,
        ephemeral.clone() as SharedStore,
    );
    let authenticator = Arc::new(
        DirectoryAuthenticator::new()
            .with_account("Admin@123", admin_user())
            .expect("seeding the directory should succeed"),
    );
    let manager = SessionManager::with_clock(config, storage, authenticator, clock.clone());

    Harness {
        manager,
        clock,
        durable,
        ephemeral,
    }
}

#[tokio::test]
async fn test_login_succeeds_for_known_member() {
    let h = harness(SessionConfig::default());

    let outcome = h
        .manager
        .login(&admin_credentials(), false)
        .await
        .expect("login should succeed");

    assert_eq!(outcome.user.role, "admin");
    assert!(!outcome.session_id.is_empty());
    assert!(h.manager.is_authenticated());

    let session = h
        .manager
        .get_current_session()
        .expect("session should exist");
    assert_eq!(session.session_id, outcome.session_id);
    assert_eq!(session.user, outcome.user);
    assert_eq!(session.csrf_token, h.manager.csrf().get_token().unwrap());
}

#[tokio::test]
async fn test_login_requires_credentials() {
    let h = harness(SessionConfig::default());

    let missing_email = Credentials {
        email: "  ".to_string(),
        password: "Admin@123".to_string(),
    };
    let result = h.manager.login(&missing_email, false).await;
    assert!(matches!(result, Err(DoormanError::InvalidInput(_))));

    let missing_password = Credentials {
        email: "admin@x".to_string(),
        password: String::new(),
    };
    let result = h.manager.login(&missing_password, false).await;
    assert!(matches!(result, Err(DoormanError::InvalidInput(_))));
}

#[tokio::test]
async fn test_login_wrong_password_rejected() {
    let h = harness(SessionConfig::default());

    let result = h.manager.login(&wrong_credentials(), false).await;
    assert!(matches!(result, Err(DoormanError::InvalidCredentials)));
    assert!(!h.manager.is_authenticated());
}

#[tokio::test]
async fn test_seventh_attempt_rate_limited_despite_correct_password() {
    let h = harness(SessionConfig::default());

    // Six consecutive failed logins: five rejected by the
    // authenticator, the sixth already over budget.
    for _ in 0..5 {
        let result = h.manager.login(&wrong_credentials(), false).await;
        assert!(matches!(result, Err(DoormanError::InvalidCredentials)));
    }
    let sixth = h.manager.login(&wrong_credentials(), false).await;
    assert!(matches!(sixth, Err(DoormanError::RateLimited)));

    // The seventh attempt fails even with correct credentials.
    let seventh = h.manager.login(&admin_credentials(), false).await;
    assert!(matches!(seventh, Err(DoormanError::RateLimited)));
}

#[tokio::test]
async fn test_rate_limit_resets_on_successful_login() {
    let h = harness(SessionConfig::default());

    for _ in 0..3 {
        let _ = h.manager.login(&wrong_credentials(), false).await;
    }
    h.manager
        .login(&admin_credentials(), false)
        .await
        .expect("login should succeed");

    // The budget is fresh again: failures report as credential errors,
    // not rate limiting.
    for _ in 0..5 {
        let result = h.manager.login(&wrong_credentials(), false).await;
        assert!(matches!(result, Err(DoormanError::InvalidCredentials)));
    }
}

#[tokio::test]
async fn test_rate_limit_window_ages_out() {
    let h = harness(SessionConfig::default());

    for _ in 0..6 {
        let _ = h.manager.login(&wrong_credentials(), false).await;
    }
    assert!(matches!(
        h.manager.login(&admin_credentials(), false).await,
        Err(DoormanError::RateLimited)
    ));

    h.clock
        .advance(ChronoDuration::from_std(SessionConfig::default().login_attempt_window).unwrap());
    h.clock.advance(ChronoDuration::seconds(1));

    h.manager
        .login(&admin_credentials(), false)
        .await
        .expect("login should succeed after the window passes");
}

#[tokio::test]
async fn test_logout_clears_session_and_csrf() {
    let h = harness(SessionConfig::default());

    h.manager
        .login(&admin_credentials(), false)
        .await
        .expect("login should succeed");
    assert!(h.manager.is_authenticated());

    assert!(h.manager.logout());

    assert!(h.manager.get_current_session().is_none());
    assert!(h.manager.get_current_user().is_none());
    assert_eq!(h.manager.csrf().get_token(), None);
    assert_eq!(h.durable.get(LEGACY_AUTH_FLAG).unwrap(), None);

    // Logging out twice is a no-op success.
    assert!(h.manager.logout());
}

#[tokio::test]
async fn test_hard_expiry_boundary() {
    let h = harness(SessionConfig::default());
    let lifetime = SessionConfig::default().session_duration;

    h.manager
        .login(&admin_credentials(), false)
        .await
        .expect("login should succeed");
    let mut events = h.manager.subscribe();

    // One millisecond before expiry the session is live.
    h.clock
        .advance(ChronoDuration::from_std(lifetime).unwrap() - ChronoDuration::milliseconds(1));
    assert!(h.manager.is_authenticated());

    // One millisecond past expiry it is gone, with full cleanup.
    h.clock.advance(ChronoDuration::milliseconds(2));
    assert!(h.manager.get_current_session().is_none());
    assert_eq!(
        h.ephemeral.get(StorageKey::Session.as_str()).unwrap(),
        None
    );
    assert_eq!(h.ephemeral.get(StorageKey::Tokens.as_str()).unwrap(), None);
    assert_eq!(h.manager.csrf().get_token(), None);

    assert_eq!(events.try_recv().unwrap(), SessionEvent::Expired);
}

#[tokio::test]
async fn test_activity_refresh_never_extends_expiry() {
    let h = harness(SessionConfig::default());

    h.manager
        .login(&admin_credentials(), false)
        .await
        .expect("login should succeed");
    let first = h.manager.get_current_session().unwrap();

    h.clock.advance(ChronoDuration::minutes(10));
    let later = h.manager.get_current_session().unwrap();

    assert!(later.last_activity > first.last_activity);
    assert_eq!(later.expires_at, first.expires_at);
    assert_eq!(later.created_at, first.created_at);
}

#[tokio::test]
async fn test_remember_me_routes_to_durable_store() {
    let h = harness(SessionConfig::default());
    let config = SessionConfig::default();

    h.manager
        .login(&admin_credentials(), true)
        .await
        .expect("login should succeed");

    assert!(h.durable.get(StorageKey::Session.as_str()).unwrap().is_some());
    assert_eq!(h.ephemeral.get(StorageKey::Session.as_str()).unwrap(), None);

    let session = h.manager.get_current_session().unwrap();
    let lifetime = session.expires_at - session.created_at;
    assert_eq!(
        lifetime,
        ChronoDuration::from_std(config.remember_me_duration).unwrap()
    );
}

#[tokio::test]
async fn test_normal_login_routes_to_ephemeral_store() {
    let h = harness(SessionConfig::default());
    let config = SessionConfig::default();

    h.manager
        .login(&admin_credentials(), false)
        .await
        .expect("login should succeed");

    assert!(h
        .ephemeral
        .get(StorageKey::Session.as_str())
        .unwrap()
        .is_some());
    assert_eq!(h.durable.get(StorageKey::Session.as_str()).unwrap(), None);

    let session = h.manager.get_current_session().unwrap();
    let lifetime = session.expires_at - session.created_at;
    assert_eq!(
        lifetime,
        ChronoDuration::from_std(config.session_duration).unwrap()
    );
}

#[tokio::test]
async fn test_login_over_login_replaces_session() {
    let h = harness(SessionConfig::default());

    let first = h
        .manager
        .login(&admin_credentials(), false)
        .await
        .expect("login should succeed");
    let first_csrf = h.manager.csrf().get_token().unwrap();

    let second = h
        .manager
        .login(&admin_credentials(), false)
        .await
        .expect("second login should succeed");

    assert_ne!(first.session_id, second.session_id);
    let session = h.manager.get_current_session().unwrap();
    assert_eq!(session.session_id, second.session_id);

    // The previous CSRF generation is dead.
    let second_csrf = h.manager.csrf().get_token().unwrap();
    assert_ne!(first_csrf, second_csrf);
    assert!(!h.manager.csrf().validate_token(&first_csrf));
}

#[tokio::test]
async fn test_corrupted_session_record_self_heals() {
    let h = harness(SessionConfig::default());

    h.manager
        .login(&admin_credentials(), false)
        .await
        .expect("login should succeed");

    h.ephemeral
        .set(StorageKey::Session.as_str(), "garbage-blob")
        .unwrap();

    // Corruption reads as "no session", and the poisoned entry is gone.
    assert!(h.manager.get_current_session().is_none());
    assert_eq!(
        h.ephemeral.get(StorageKey::Session.as_str()).unwrap(),
        None
    );
}

#[tokio::test]
async fn test_register_rejects_invalid_input() {
    let h = harness(SessionConfig::default());

    let weak_password = Registration {
        name: "Bob".to_string(),
        email: "bob@example.com".to_string(),
        password: "password".to_string(),
    };
    assert!(matches!(
        h.manager.register(&weak_password).await,
        Err(DoormanError::InvalidInput(_))
    ));

    let bad_email = Registration {
        name: "Bob".to_string(),
        email: "bob-at-example".to_string(),
        password: "Secret@123".to_string(),
    };
    assert!(matches!(
        h.manager.register(&bad_email).await,
        Err(DoormanError::InvalidInput(_))
    ));

    assert!(!h.manager.is_authenticated());
}

#[tokio::test]
async fn test_register_establishes_short_session() {
    let h = harness(SessionConfig::default());
    let config = SessionConfig::default();

    let outcome = h
        .manager
        .register(&Registration {
            name: "Bob".to_string(),
            email: "bob@example.com".to_string(),
            password: "Secret@123".to_string(),
        })
        .await
        .expect("registration should succeed");

    assert_eq!(outcome.user.role, "member");
    assert!(h.manager.is_authenticated());

    // Registration never grants the remember-me lifetime.
    let session = h.manager.get_current_session().unwrap();
    let lifetime = session.expires_at - session.created_at;
    assert_eq!(
        lifetime,
        ChronoDuration::from_std(config.session_duration).unwrap()
    );
}

#[tokio::test]
async fn test_register_duplicate_email_propagates() {
    let h = harness(SessionConfig::default());

    let registration = Registration {
        name: "Another Admin".to_string(),
        email: "admin@x".to_string(),
        password: "Secret@123".to_string(),
    };
    // Registrar rejection propagates unchanged to the caller.
    let result = h.manager.register(&registration).await;
    assert!(matches!(result, Err(DoormanError::InvalidInput(_))));
}

#[tokio::test]
async fn test_logout_emits_no_lifecycle_event() {
    let h = harness(SessionConfig::default());

    h.manager
        .login(&admin_credentials(), false)
        .await
        .expect("login should succeed");
    let mut events = h.manager.subscribe();

    h.manager.logout();

    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_warning_then_expiry_timers_fire() {
    let config = SessionConfig {
        session_duration: Duration::from_millis(300),
        expiry_warning_lead: Duration::from_millis(100),
        ..SessionConfig::default()
    };

    let durable = Arc::new(MemoryStore::new());
    let ephemeral = Arc::new(MemoryStore::new());
    let storage = SecureStorage::new(
        EncryptionService::new(),
        SecretString::from("lifecycle-test-secret".to_string()),
        durable as SharedStore,
        ephemeral as SharedStore,
    );
    let authenticator = Arc::new(
        DirectoryAuthenticator::new()
            .with_account("Admin@123", admin_user())
            .expect("seeding the directory should succeed"),
    );
    // System clock: the timers are driven by tokio's (paused) time.
    let manager = SessionManager::new(config, storage, authenticator);

    let mut events = manager.subscribe();
    manager
        .login(&admin_credentials(), false)
        .await
        .expect("login should succeed");

    let warning = events.recv().await.expect("warning event should arrive");
    assert_eq!(
        warning,
        SessionEvent::ExpiryWarning {
            remaining: Duration::from_millis(100),
        }
    );

    let expired = events.recv().await.expect("expiry event should arrive");
    assert_eq!(expired, SessionEvent::Expired);

    // Cleanup ran even though nothing was reading the session.
    assert!(manager.get_current_session().is_none());
    assert_eq!(manager.csrf().get_token(), None);
}

#[tokio::test(start_paused = true)]
async fn test_new_login_cancels_stale_timers() {
    let config = SessionConfig {
        session_duration: Duration::from_millis(200),
        expiry_warning_lead: Duration::from_millis(50),
        ..SessionConfig::default()
    };

    let durable = Arc::new(MemoryStore::new());
    let ephemeral = Arc::new(MemoryStore::new());
    let storage = SecureStorage::new(
        EncryptionService::new(),
        SecretString::from("lifecycle-test-secret".to_string()),
        durable as SharedStore,
        ephemeral as SharedStore,
    );
    let authenticator = Arc::new(
        DirectoryAuthenticator::new()
            .with_account("Admin@123", admin_user())
            .expect("seeding the directory should succeed"),
    );
    let manager = SessionManager::new(config, storage, authenticator);

    manager
        .login(&admin_credentials(), false)
        .await
        .expect("login should succeed");

    // Sleep most of the first session away, then log in again: the
    // first session's timers must not expire the second session.
    tokio::time::sleep(Duration::from_millis(150)).await;
    manager
        .login(&admin_credentials(), false)
        .await
        .expect("second login should succeed");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(
        manager.is_authenticated(),
        "a stale timer must not expire the new session"
    );
}
