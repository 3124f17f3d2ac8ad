use crate::{
    Account, AccountId, Error, LeaderboardEntry, Session, SessionId,
    repositories::{
        AccountRepository, LeaderboardRepository, RepositoryProvider, SessionRepository,
    },
    storage::{NewAccount, NewSession},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Adapter that wraps a RepositoryProvider and implements [`AccountRepository`]
pub struct AccountRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> AccountRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> AccountRepository for AccountRepositoryAdapter<R> {
    async fn create(&self, account: NewAccount) -> Result<Account, Error> {
        self.provider.account().create(account).await
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, Error> {
        self.provider.account().find_by_id(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, Error> {
        self.provider.account().find_by_email(email).await
    }

    async fn upsert_by_email(&self, account: NewAccount) -> Result<Account, Error> {
        self.provider.account().upsert_by_email(account).await
    }

    async fn update_security_state(&self, account: &Account) -> Result<Account, Error> {
        self.provider.account().update_security_state(account).await
    }

    async fn set_password_hash(&self, id: &AccountId, password_hash: &str) -> Result<(), Error> {
        self.provider
            .account()
            .set_password_hash(id, password_hash)
            .await
    }

    async fn set_reset_token(
        &self,
        id: &AccountId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        self.provider
            .account()
            .set_reset_token(id, token_hash, expires_at)
            .await
    }

    async fn find_by_reset_token(&self, token_hash: &str) -> Result<Option<Account>, Error> {
        self.provider.account().find_by_reset_token(token_hash).await
    }

    async fn consume_reset_token(
        &self,
        token_hash: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, Error> {
        self.provider
            .account()
            .consume_reset_token(token_hash, new_password_hash, now)
            .await
    }
}

pub struct SessionRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> SessionRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> SessionRepository for SessionRepositoryAdapter<R> {
    async fn create(&self, session: NewSession) -> Result<Session, Error> {
        self.provider.session().create(session).await
    }

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<Session>, Error> {
        self.provider.session().find_by_id(id).await
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>, Error> {
        self.provider.session().find_by_token_hash(token_hash).await
    }

    async fn record_activity(&self, session: &Session) -> Result<Session, Error> {
        self.provider.session().record_activity(session).await
    }

    async fn close(&self, id: &SessionId, now: DateTime<Utc>) -> Result<bool, Error> {
        self.provider.session().close(id, now).await
    }

    async fn close_all_for_account(
        &self,
        account_id: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<u64, Error> {
        self.provider
            .session()
            .close_all_for_account(account_id, now)
            .await
    }

    async fn total_active_seconds(&self, account_id: &AccountId) -> Result<i64, Error> {
        self.provider.session().total_active_seconds(account_id).await
    }
}

pub struct LeaderboardRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> LeaderboardRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> LeaderboardRepository for LeaderboardRepositoryAdapter<R> {
    async fn count_ranked_accounts(&self) -> Result<u64, Error> {
        self.provider.leaderboard().count_ranked_accounts().await
    }

    async fn ranked_accounts(
        &self,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, Error> {
        self.provider
            .leaderboard()
            .ranked_accounts(offset, limit)
            .await
    }
}
