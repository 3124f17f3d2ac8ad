use std::sync::Arc;

use hourglass::{
    AuthError, ClientContext, Error, Hourglass, HourglassError, SqliteRepositoryProvider,
    ValidationError,
};
use sqlx::sqlite::SqlitePoolOptions;

async fn setup() -> Arc<Hourglass<SqliteRepositoryProvider>> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let hourglass = Hourglass::new(Arc::new(SqliteRepositoryProvider::new(pool)));
    hourglass.migrate().await.unwrap();
    Arc::new(hourglass)
}

fn auth_error(err: HourglassError) -> AuthError {
    match err {
        HourglassError::Core(Error::Auth(e)) => e,
        other => panic!("expected an auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_register_and_login() {
    let hourglass = setup().await;

    let account = hourglass
        .register("  Ada@Example.com ", "password123", Some("Ada".to_string()))
        .await
        .unwrap();
    assert_eq!(account.email, "ada@example.com");

    let login = hourglass
        .login_with_password(
            "ADA@example.com",
            "password123",
            None,
            ClientContext::new(Some("test".to_string()), None),
        )
        .await
        .unwrap();
    assert_eq!(login.account.id, account.id);
    assert!(login.session.is_open());
    assert_eq!(login.session.user_agent.as_deref(), Some("test"));

    let session = hourglass.authenticate_session(&login.token).await.unwrap();
    assert_eq!(session.id, login.session.id);
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_bad_input() {
    let hourglass = setup().await;

    hourglass
        .register("dup@example.com", "password123", None)
        .await
        .unwrap();

    let err = hourglass
        .register("DUP@example.com", "password123", None)
        .await
        .unwrap_err();
    assert!(matches!(auth_error(err), AuthError::AccountAlreadyExists));

    let err = hourglass
        .register("not-an-email", "password123", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HourglassError::Core(Error::Validation(ValidationError::InvalidEmail(_)))
    ));

    let err = hourglass
        .register("short@example.com", "short", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HourglassError::Core(Error::Validation(ValidationError::InvalidPassword(_)))
    ));
}

#[tokio::test]
async fn test_unknown_email_is_invalid_credentials() {
    let hourglass = setup().await;

    let err = hourglass
        .login_with_password("ghost@example.com", "password123", None, ClientContext::default())
        .await
        .unwrap_err();
    assert!(matches!(auth_error(err), AuthError::InvalidCredentials));
}

#[tokio::test]
async fn test_third_failure_locks_account() {
    let hourglass = setup().await;
    let account = hourglass
        .register("lock@example.com", "password123", None)
        .await
        .unwrap();

    for _ in 0..2 {
        let err = hourglass
            .login_with_password("lock@example.com", "wrong", None, ClientContext::default())
            .await
            .unwrap_err();
        assert!(matches!(auth_error(err), AuthError::InvalidCredentials));
    }

    let err = hourglass
        .login_with_password("lock@example.com", "wrong", None, ClientContext::default())
        .await
        .unwrap_err();
    assert!(matches!(auth_error(err), AuthError::AccountLocked { .. }));

    // The right password does not get through the lockout
    let err = hourglass
        .login_with_password("lock@example.com", "password123", None, ClientContext::default())
        .await
        .unwrap_err();
    assert!(matches!(auth_error(err), AuthError::AccountLocked { .. }));

    let stored = hourglass.get_account(&account.id).await.unwrap().unwrap();
    assert_eq!(stored.lockout_level, 1);
    assert_eq!(stored.failed_attempts, 0);
    assert!(stored.lockout_until.is_some());
}

#[tokio::test]
async fn test_concurrent_failures_are_all_counted() {
    let hourglass = setup().await;
    let account = hourglass
        .register("race@example.com", "password123", None)
        .await
        .unwrap();

    let attempts: Vec<_> = (0..3)
        .map(|_| {
            let hourglass = hourglass.clone();
            tokio::spawn(async move {
                hourglass
                    .login_with_password("race@example.com", "wrong", None, ClientContext::default())
                    .await
            })
        })
        .collect();

    for attempt in attempts {
        assert!(attempt.await.unwrap().is_err());
    }

    let stored = hourglass.get_account(&account.id).await.unwrap().unwrap();
    assert_eq!(stored.lockout_level, 1);
    assert!(stored.lockout_until.is_some());
}

#[tokio::test]
async fn test_successful_login_resets_counter() {
    let hourglass = setup().await;
    let account = hourglass
        .register("reset@example.com", "password123", None)
        .await
        .unwrap();

    for _ in 0..2 {
        let _ = hourglass
            .login_with_password("reset@example.com", "wrong", None, ClientContext::default())
            .await;
    }
    hourglass
        .login_with_password("reset@example.com", "password123", None, ClientContext::default())
        .await
        .unwrap();

    let stored = hourglass.get_account(&account.id).await.unwrap().unwrap();
    assert_eq!(stored.failed_attempts, 0);
    assert_eq!(stored.lockout_level, 0);
}

#[tokio::test]
async fn test_login_continues_presented_session() {
    let hourglass = setup().await;
    hourglass
        .register("tabs@example.com", "password123", None)
        .await
        .unwrap();

    let first = hourglass
        .login_with_password("tabs@example.com", "password123", None, ClientContext::default())
        .await
        .unwrap();
    let continued = hourglass
        .login_with_password(
            "tabs@example.com",
            "password123",
            Some(&first.token),
            ClientContext::default(),
        )
        .await
        .unwrap();
    assert_eq!(continued.session.id, first.session.id);

    // A second device gets its own session and the first stays open
    let second = hourglass
        .login_with_password("tabs@example.com", "password123", None, ClientContext::default())
        .await
        .unwrap();
    assert_ne!(second.session.id, first.session.id);
    assert!(hourglass.authenticate_session(&first.token).await.is_ok());
}

#[tokio::test]
async fn test_set_password_replaces_password() {
    let hourglass = setup().await;
    let account = hourglass
        .register("local@example.com", "password123", None)
        .await
        .unwrap();

    hourglass
        .set_password(&account.id, "another-password")
        .await
        .unwrap();

    assert!(
        hourglass
            .login_with_password("local@example.com", "password123", None, ClientContext::default())
            .await
            .is_err()
    );
    hourglass
        .login_with_password(
            "local@example.com",
            "another-password",
            None,
            ClientContext::default(),
        )
        .await
        .unwrap();
}
