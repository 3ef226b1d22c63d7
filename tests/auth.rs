use credential_server::{AuthError, AuthService, CredentialStore, MemoryCredentialStore, Settings};
use std::sync::Arc;

fn setup() -> (Arc<MemoryCredentialStore>, Arc<AuthService>) {
    let config = Settings::new_for_test().expect("Failed to load test config");
    let store = Arc::new(MemoryCredentialStore::new());
    let service = AuthService::from_settings(store.clone(), &config).expect("valid hash params");
    (store, Arc::new(service))
}

const PAIRS: &[(&str, &str)] = &[
    ("alice", "s3cret"),
    ("bob", "correct horse battery staple"),
    ("ünïcødé", "pässwörd"),
    ("user.with+symbols@example.com", "p@$$w0rd!"),
    ("x", "y"),
];

#[tokio::test]
async fn test_register_then_login_for_many_pairs() {
    let (_, service) = setup();

    for (username, password) in PAIRS {
        service.register(username, password).await.unwrap();
        let directive = service.login(username, password).await.unwrap();
        assert!(!directive.value.is_empty(), "empty token for {}", username);
        assert_eq!(directive.max_age_secs, 604800);
    }
}

#[tokio::test]
async fn test_second_registration_never_overwrites() {
    let (store, service) = setup();

    for (username, password) in PAIRS {
        service.register(username, password).await.unwrap();
        let before = store.find_by_username(username).await.unwrap().unwrap();

        for other in ["", "different", *password] {
            let err = service.register(username, other).await.unwrap_err();
            assert_eq!(err, AuthError::UsernameTaken, "password {:?}", other);
        }

        let after = store.find_by_username(username).await.unwrap().unwrap();
        assert_eq!(before, after);
    }
    assert_eq!(store.len().await, PAIRS.len());
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_fail_identically() {
    let (_, service) = setup();

    for (username, password) in PAIRS {
        service.register(username, password).await.unwrap();

        let wrong = service.login(username, &format!("{}-nope", password)).await.unwrap_err();
        let missing = service.login(&format!("{}-nobody", username), password).await.unwrap_err();

        assert_eq!(wrong, AuthError::InvalidCredentials);
        assert_eq!(wrong, missing);
        assert_eq!(wrong.to_string(), missing.to_string());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registrations_create_one_account() {
    let (store, service) = setup();

    let handles: Vec<_> = (0..12)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move { service.register("contested", &format!("password-{}", i)).await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(AuthError::UsernameTaken) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let (_, service) = setup();

    let first = service.logout(None);
    let second = service.logout(None);
    assert_eq!(first, second);
    assert_eq!(first.max_age_secs, 0);
    assert!(first.value.is_empty());
}
