//! Persisted lockout decisions
//!
//! [`LockoutPolicy`] decides; this service reads the account, lets the policy
//! mutate a copy, and writes it back with a compare-and-swap on the account's
//! revision. When another request updated the account in between, the write
//! is refused, the account re-read and the decision taken again on fresh
//! state, so concurrent failures are never lost.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    Account, AttemptOutcome, Error, LockoutPolicy,
    crypto::dummy_verify_password,
    error::{AuthError, StorageError},
    repositories::AccountRepository,
    services::MAX_CONFLICT_RETRIES,
    validation::normalize_email,
};

pub struct LockoutService<R: AccountRepository> {
    repository: Arc<R>,
    policy: LockoutPolicy,
}

impl<R: AccountRepository> LockoutService<R> {
    pub fn new(repository: Arc<R>, policy: LockoutPolicy) -> Self {
        Self { repository, policy }
    }

    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    /// Check a password for `email` and persist the resulting lockout state.
    ///
    /// Returns the account on success. Failures map to
    /// [`AuthError::InvalidCredentials`], [`AuthError::AccountLocked`] or
    /// [`AuthError::AccountDisabled`]. An unknown email costs the same hashing
    /// work as a known one and reports `InvalidCredentials`.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Account, Error> {
        let email = normalize_email(email);

        let Some(account) = self.repository.find_by_email(&email).await? else {
            dummy_verify_password(password);
            tracing::debug!("Login attempt for unknown email");
            return Err(Error::Auth(AuthError::InvalidCredentials));
        };

        self.decide(account, |policy, account| {
            policy.attempt(account, password, now)
        })
        .await
    }

    /// Gate an identity that was verified elsewhere.
    ///
    /// Disabled and currently locked accounts are refused; otherwise the
    /// failure counter is reset as for a successful password login.
    pub async fn admit(&self, account: Account, now: DateTime<Utc>) -> Result<Account, Error> {
        self.decide(account, |policy, account| policy.admit(account, now))
            .await
    }

    async fn decide<F>(&self, mut account: Account, transition: F) -> Result<Account, Error>
    where
        F: Fn(&LockoutPolicy, &mut Account) -> AttemptOutcome,
    {
        let mut retries = 0;

        loop {
            let mut candidate = account.clone();
            let outcome = transition(&self.policy, &mut candidate);

            if !security_state_changed(&account, &candidate) {
                return outcome_into_result(outcome, candidate);
            }

            match self.repository.update_security_state(&candidate).await {
                Ok(saved) => {
                    log_outcome(&saved, &outcome);
                    return outcome_into_result(outcome, saved);
                }
                Err(Error::Storage(StorageError::Conflict)) if retries < MAX_CONFLICT_RETRIES => {
                    retries += 1;
                    tracing::debug!(
                        account_id = %account.id,
                        retries,
                        "Lost update on account security state, retrying"
                    );
                    account = self
                        .repository
                        .find_by_id(&account.id)
                        .await?
                        .ok_or(Error::Storage(StorageError::NotFound))?;
                }
                Err(e) => {
                    if e.is_conflict() {
                        tracing::warn!(
                            account_id = %account.id,
                            "Giving up on account security state after repeated conflicts"
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}

fn security_state_changed(before: &Account, after: &Account) -> bool {
    before.failed_attempts != after.failed_attempts
        || before.lockout_until != after.lockout_until
        || before.lockout_level != after.lockout_level
        || before.disabled != after.disabled
}

fn log_outcome(account: &Account, outcome: &AttemptOutcome) {
    match outcome {
        AttemptOutcome::Success => {}
        AttemptOutcome::InvalidCredential => {
            tracing::warn!(
                account_id = %account.id,
                failed_attempts = account.failed_attempts,
                "Failed login attempt"
            );
        }
        AttemptOutcome::AccountLocked { until } => {
            tracing::warn!(
                account_id = %account.id,
                lockout_level = account.lockout_level,
                locked_until = %until,
                "Account locked after repeated failed logins"
            );
        }
        AttemptOutcome::AccountDisabled => {
            tracing::warn!(account_id = %account.id, "Account disabled after repeated failed logins");
        }
    }
}

/// Lockout deadlines are reported as stored, so every refusal for the same
/// lockout names the same instant.
fn outcome_into_result(outcome: AttemptOutcome, account: Account) -> Result<Account, Error> {
    match outcome {
        AttemptOutcome::Success => Ok(account),
        AttemptOutcome::InvalidCredential => Err(Error::Auth(AuthError::InvalidCredentials)),
        AttemptOutcome::AccountLocked { until } => Err(Error::Auth(AuthError::AccountLocked {
            until: account.lockout_until.unwrap_or(until),
        })),
        AttemptOutcome::AccountDisabled => Err(Error::Auth(AuthError::AccountDisabled)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        crypto::hash_password, repositories::AccountRepository, services::testing::MockStore,
        storage::NewAccount,
    };
    use chrono::Duration;

    const PASSWORD: &str = "hunter2hunter2";

    async fn setup() -> (Arc<MockStore>, LockoutService<MockStore>, Account) {
        let store = MockStore::new();
        let account = AccountRepository::create(
            store.as_ref(),
            NewAccount::builder()
                .email("lock@example.com".to_string())
                .password_hash(hash_password(PASSWORD))
                .build()
                .unwrap(),
        )
        .await
        .unwrap();
        let service = LockoutService::new(store.clone(), LockoutPolicy::default());
        (store, service, account)
    }

    #[tokio::test]
    async fn test_successful_login() {
        let (_store, service, account) = setup().await;
        let authenticated = service
            .authenticate("Lock@Example.com", PASSWORD, Utc::now())
            .await
            .unwrap();
        assert_eq!(authenticated.id, account.id);
    }

    #[tokio::test]
    async fn test_unknown_email_is_invalid_credentials() {
        let (_store, service, _) = setup().await;
        let err = service
            .authenticate("ghost@example.com", PASSWORD, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_third_failure_locks_and_persists() {
        let (store, service, account) = setup().await;
        let now = Utc::now();

        for _ in 0..2 {
            let err = service
                .authenticate("lock@example.com", "wrong", now)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Auth(AuthError::InvalidCredentials)));
        }
        assert_eq!(store.account(&account.id).await.failed_attempts, 2);

        let err = service
            .authenticate("lock@example.com", "wrong", now)
            .await
            .unwrap_err();
        let expected_until = now + Duration::minutes(1);
        assert!(matches!(
            err,
            Error::Auth(AuthError::AccountLocked { until }) if until == expected_until
        ));

        let stored = store.account(&account.id).await;
        assert_eq!(stored.lockout_level, 1);
        assert_eq!(stored.failed_attempts, 0);
        assert_eq!(stored.lockout_until, Some(expected_until));

        // The correct password does not help while locked
        let err = service
            .authenticate("lock@example.com", PASSWORD, now + Duration::seconds(30))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::AccountLocked { .. })));

        // After the lockout ends it does
        service
            .authenticate("lock@example.com", PASSWORD, now + Duration::seconds(61))
            .await
            .unwrap();
        let stored = store.account(&account.id).await;
        assert_eq!(stored.lockout_until, None);
        assert_eq!(stored.lockout_level, 1);
    }

    #[tokio::test]
    async fn test_conflict_is_retried_on_fresh_state() {
        let (store, service, account) = setup().await;
        store.inject_conflicts(2);

        let err = service
            .authenticate("lock@example.com", "wrong", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::InvalidCredentials)));

        let stored = store.account(&account.id).await;
        assert_eq!(stored.failed_attempts, 1);
        // Two simulated concurrent writers plus our own write
        assert_eq!(stored.revision, 3);
    }

    #[tokio::test]
    async fn test_conflict_surfaces_after_retries_exhausted() {
        let (store, service, _) = setup().await;
        store.inject_conflicts(MAX_CONFLICT_RETRIES + 1);

        let err = service
            .authenticate("lock@example.com", "wrong", Utc::now())
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_concurrent_failures_are_not_lost() {
        let (store, service, account) = setup().await;
        let service = Arc::new(service);
        let now = Utc::now();

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move {
                    service.authenticate("lock@example.com", "wrong", now).await
                })
            })
            .collect();
        for handle in handles {
            let _ = handle.await.unwrap();
        }

        assert_eq!(store.account(&account.id).await.failed_attempts, 2);
    }

    #[tokio::test]
    async fn test_admit_refuses_locked_account() {
        let (store, service, account) = setup().await;
        let now = Utc::now();

        let mut locked = store.account(&account.id).await;
        locked.lockout_until = Some(now + Duration::hours(1));
        let locked = AccountRepository::update_security_state(store.as_ref(), &locked)
            .await
            .unwrap();

        let err = service.admit(locked, now).await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::AccountLocked { .. })));
    }

    #[tokio::test]
    async fn test_admit_resets_failures() {
        let (store, service, _) = setup().await;
        let now = Utc::now();

        let _ = service.authenticate("lock@example.com", "wrong", now).await;
        let account = AccountRepository::find_by_email(store.as_ref(), "lock@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.failed_attempts, 1);

        let admitted = service.admit(account, now).await.unwrap();
        assert_eq!(admitted.failed_attempts, 0);
    }
}
