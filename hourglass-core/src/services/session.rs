use crate::{
    AccountId, ActivityPolicy, ClientContext, Error, Session, SessionConfig, SessionId,
    SessionToken,
    error::{AuthError, SessionError, StorageError},
    repositories::SessionRepository,
    services::MAX_CONFLICT_RETRIES,
    storage::NewSession,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result of an accepted activity report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityReceipt {
    pub accepted_seconds: i64,
    /// Active time of the session after applying the report
    pub total_active_seconds: i64,
}

/// Service for the session ledger
pub struct SessionService<R: SessionRepository> {
    repository: Arc<R>,
    config: SessionConfig,
    activity: ActivityPolicy,
}

impl<R: SessionRepository> SessionService<R> {
    pub fn new(repository: Arc<R>, config: SessionConfig, activity: ActivityPolicy) -> Self {
        Self {
            repository,
            config,
            activity,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Open a new session. Other open sessions of the account are left alone.
    ///
    /// The returned token is the only copy of the plaintext; the ledger keeps
    /// its hash.
    pub async fn open(
        &self,
        account_id: &AccountId,
        client: ClientContext,
        now: DateTime<Utc>,
    ) -> Result<(Session, SessionToken), Error> {
        let token = SessionToken::new_random();
        let session = self
            .repository
            .create(NewSession::new(account_id.clone(), token.hash(), client, now))
            .await?;

        tracing::info!(
            account_id = %account_id,
            session_id = %session.id,
            "Session opened"
        );
        Ok((session, token))
    }

    /// Keep using the presented session if it is an open, unexpired session of
    /// `account_id`; otherwise open a new one.
    pub async fn continue_or_open(
        &self,
        account_id: &AccountId,
        presented: Option<&SessionToken>,
        client: ClientContext,
        now: DateTime<Utc>,
    ) -> Result<(Session, SessionToken), Error> {
        if let Some(token) = presented {
            if let Some(session) = self.repository.find_by_token_hash(&token.hash()).await? {
                if &session.account_id == account_id && session.is_open() {
                    if !self.timeout_check(&session, now) {
                        tracing::debug!(session_id = %session.id, "Continuing existing session");
                        return Ok((session, token.clone()));
                    }
                    self.repository.close(&session.id, now).await?;
                }
            }
        }

        self.open(account_id, client, now).await
    }

    /// Close a session. Closing an already closed session is a no-op.
    pub async fn close(&self, id: &SessionId, now: DateTime<Utc>) -> Result<(), Error> {
        if self.repository.close(id, now).await? {
            tracing::info!(session_id = %id, "Session closed");
            return Ok(());
        }

        match self.repository.find_by_id(id).await? {
            Some(_) => Ok(()),
            None => Err(Error::Session(SessionError::NotFound)),
        }
    }

    /// Whether the session has outlived the configured maximum age.
    pub fn timeout_check(&self, session: &Session, now: DateTime<Utc>) -> bool {
        session.is_timed_out(now, self.config.max_age)
    }

    /// Resolve a bearer token to its open session.
    ///
    /// Unknown tokens are [`SessionError::NotFound`], closed sessions
    /// [`AuthError::NotAuthenticated`]. A session past its maximum age is closed
    /// here and reported as [`SessionError::Expired`].
    pub async fn authenticate(
        &self,
        token: &SessionToken,
        now: DateTime<Utc>,
    ) -> Result<Session, Error> {
        let session = self
            .repository
            .find_by_token_hash(&token.hash())
            .await?
            .ok_or(Error::Session(SessionError::NotFound))?;

        if !session.is_open() {
            return Err(Error::Auth(AuthError::NotAuthenticated));
        }

        if self.timeout_check(&session, now) {
            self.repository.close(&session.id, now).await?;
            tracing::info!(session_id = %session.id, "Session timed out");
            return Err(Error::Session(SessionError::Expired));
        }

        Ok(session)
    }

    /// Apply a client activity report to a session.
    ///
    /// Rejected reports leave the session untouched and are logged; they do
    /// not close or otherwise penalize the session.
    pub async fn record_activity(
        &self,
        id: &SessionId,
        claimed_seconds: i64,
        now: DateTime<Utc>,
    ) -> Result<ActivityReceipt, Error> {
        let mut retries = 0;

        loop {
            let mut session = self
                .repository
                .find_by_id(id)
                .await?
                .ok_or(Error::Session(SessionError::NotFound))?;

            let accepted = match self.activity.reconcile(&mut session, claimed_seconds, now) {
                Ok(accepted) => accepted,
                Err(rejection) => {
                    tracing::warn!(
                        session_id = %id,
                        claimed_seconds,
                        reason = %rejection,
                        "Activity report rejected"
                    );
                    return Err(Error::Session(SessionError::ActivityRejected(rejection)));
                }
            };

            match self.repository.record_activity(&session).await {
                Ok(saved) => {
                    return Ok(ActivityReceipt {
                        accepted_seconds: accepted,
                        total_active_seconds: saved.active_time_seconds,
                    });
                }
                Err(Error::Storage(StorageError::Conflict)) if retries < MAX_CONFLICT_RETRIES => {
                    retries += 1;
                    tracing::debug!(session_id = %id, retries, "Lost update on session, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Close every open session of an account
    pub async fn close_all_for_account(
        &self,
        account_id: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<u64, Error> {
        let closed = self
            .repository
            .close_all_for_account(account_id, now)
            .await?;
        if closed > 0 {
            tracing::info!(account_id = %account_id, closed, "Closed open sessions");
        }
        Ok(closed)
    }

    /// Active time summed over all of the account's sessions
    pub async fn total_active_seconds(&self, account_id: &AccountId) -> Result<i64, Error> {
        self.repository.total_active_seconds(account_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ActivityRejection, services::testing::MockStore};
    use chrono::Duration;

    fn service(store: &Arc<MockStore>) -> SessionService<MockStore> {
        SessionService::new(
            store.clone(),
            SessionConfig::default(),
            ActivityPolicy::default(),
        )
    }

    #[tokio::test]
    async fn test_open_and_authenticate() {
        let store = MockStore::new();
        let service = service(&store);
        let account_id = AccountId::new_random();
        let now = Utc::now();

        let client = ClientContext::new(Some("test-agent".to_string()), Some("10.0.0.1".to_string()));
        let (session, token) = service.open(&account_id, client, now).await.unwrap();
        assert!(session.is_open());
        assert_eq!(session.user_agent.as_deref(), Some("test-agent"));
        assert_ne!(session.token_hash, token.as_str());

        let found = service.authenticate(&token, now).await.unwrap();
        assert_eq!(found.id, session.id);
    }

    #[tokio::test]
    async fn test_open_does_not_close_other_sessions() {
        let store = MockStore::new();
        let service = service(&store);
        let account_id = AccountId::new_random();
        let now = Utc::now();

        let (first, _) = service
            .open(&account_id, ClientContext::default(), now)
            .await
            .unwrap();
        let (second, _) = service
            .open(&account_id, ClientContext::default(), now)
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert!(store.session(&first.id).await.is_open());
        assert!(store.session(&second.id).await.is_open());
    }

    #[tokio::test]
    async fn test_unknown_token_is_not_found() {
        let service = service(&MockStore::new());
        let err = service
            .authenticate(&SessionToken::new_random(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Session(SessionError::NotFound)));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let store = MockStore::new();
        let service = service(&store);
        let now = Utc::now();
        let (session, token) = service
            .open(&AccountId::new_random(), ClientContext::default(), now)
            .await
            .unwrap();

        service.close(&session.id, now).await.unwrap();
        service
            .close(&session.id, now + Duration::minutes(5))
            .await
            .unwrap();

        let stored = store.session(&session.id).await;
        assert_eq!(stored.logout_time, Some(now));

        let err = service.authenticate(&token, now).await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::NotAuthenticated)));

        let err = service
            .close(&SessionId::new_random(), now)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Session(SessionError::NotFound)));
    }

    #[tokio::test]
    async fn test_timed_out_session_is_closed_lazily() {
        let store = MockStore::new();
        let service = service(&store);
        let login = Utc::now();
        let (session, token) = service
            .open(&AccountId::new_random(), ClientContext::default(), login)
            .await
            .unwrap();

        assert!(!service.timeout_check(&session, login + Duration::hours(2)));
        service
            .authenticate(&token, login + Duration::hours(2))
            .await
            .unwrap();

        let later = login + Duration::hours(2) + Duration::seconds(1);
        assert!(service.timeout_check(&session, later));
        let err = service.authenticate(&token, later).await.unwrap_err();
        assert!(matches!(err, Error::Session(SessionError::Expired)));
        assert_eq!(store.session(&session.id).await.logout_time, Some(later));
    }

    #[tokio::test]
    async fn test_record_activity_bounds() {
        let store = MockStore::new();
        let service = service(&store);
        let login = Utc::now();
        let (session, _) = service
            .open(&AccountId::new_random(), ClientContext::default(), login)
            .await
            .unwrap();

        let receipt = service
            .record_activity(&session.id, 30, login + Duration::seconds(30))
            .await
            .unwrap();
        assert_eq!(
            receipt,
            ActivityReceipt {
                accepted_seconds: 30,
                total_active_seconds: 30
            }
        );

        // Immediate replay finds no elapsed wall-clock time
        let err = service
            .record_activity(&session.id, 30, login + Duration::seconds(30))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Session(SessionError::ActivityRejected(
                ActivityRejection::ExceedsBound { allowed: 0, .. }
            ))
        ));

        let err = service
            .record_activity(&session.id, -1, login + Duration::seconds(40))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Session(SessionError::ActivityRejected(ActivityRejection::Negative { .. }))
        ));

        // The rejected reports did not move the baseline or penalize the session
        let stored = store.session(&session.id).await;
        assert!(stored.is_open());
        assert_eq!(stored.active_time_seconds, 30);
        assert_eq!(stored.last_update_time, Some(login + Duration::seconds(30)));
    }

    #[tokio::test]
    async fn test_record_activity_unknown_session() {
        let service = service(&MockStore::new());
        let err = service
            .record_activity(&SessionId::new_random(), 1, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Session(SessionError::NotFound)));
    }

    #[tokio::test]
    async fn test_record_activity_retries_conflict() {
        let store = MockStore::new();
        let service = service(&store);
        let login = Utc::now();
        let (session, _) = service
            .open(&AccountId::new_random(), ClientContext::default(), login)
            .await
            .unwrap();

        store.inject_conflicts(1);
        let receipt = service
            .record_activity(&session.id, 10, login + Duration::seconds(10))
            .await
            .unwrap();
        assert_eq!(receipt.total_active_seconds, 10);
    }

    #[tokio::test]
    async fn test_continue_or_open() {
        let store = MockStore::new();
        let service = service(&store);
        let account_id = AccountId::new_random();
        let now = Utc::now();

        let (first, token) = service
            .continue_or_open(&account_id, None, ClientContext::default(), now)
            .await
            .unwrap();

        let (continued, same_token) = service
            .continue_or_open(&account_id, Some(&token), ClientContext::default(), now)
            .await
            .unwrap();
        assert_eq!(continued.id, first.id);
        assert_eq!(same_token, token);

        // Another account's token is never continued
        let (other, _) = service
            .continue_or_open(
                &AccountId::new_random(),
                Some(&token),
                ClientContext::default(),
                now,
            )
            .await
            .unwrap();
        assert_ne!(other.id, first.id);

        // An expired session is closed and replaced
        let later = now + Duration::hours(3);
        let (fresh, _) = service
            .continue_or_open(&account_id, Some(&token), ClientContext::default(), later)
            .await
            .unwrap();
        assert_ne!(fresh.id, first.id);
        assert_eq!(store.session(&first.id).await.logout_time, Some(later));
    }

    #[tokio::test]
    async fn test_close_all_and_totals() {
        let store = MockStore::new();
        let service = service(&store);
        let account_id = AccountId::new_random();
        let login = Utc::now();

        let (a, _) = service
            .open(&account_id, ClientContext::default(), login)
            .await
            .unwrap();
        let (b, _) = service
            .open(&account_id, ClientContext::default(), login)
            .await
            .unwrap();
        let now = login + Duration::seconds(20);
        service.record_activity(&a.id, 20, now).await.unwrap();
        service.record_activity(&b.id, 15, now).await.unwrap();
        service.close(&a.id, now).await.unwrap();

        assert_eq!(service.total_active_seconds(&account_id).await.unwrap(), 35);
        assert_eq!(service.close_all_for_account(&account_id, now).await.unwrap(), 1);
        assert!(!store.session(&b.id).await.is_open());
        assert_eq!(service.total_active_seconds(&account_id).await.unwrap(), 35);
    }
}
