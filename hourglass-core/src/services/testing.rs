//! In-memory repositories for service tests

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{
    Account, AccountId, Error, LeaderboardEntry, Session, SessionId,
    error::StorageError,
    repositories::{AccountRepository, LeaderboardRepository, SessionRepository},
    storage::{NewAccount, NewSession},
};

/// One shared store so the leaderboard can see accounts and sessions together.
#[derive(Default)]
pub struct MockStore {
    pub accounts: Arc<Mutex<HashMap<AccountId, Account>>>,
    pub sessions: Arc<Mutex<HashMap<SessionId, Session>>>,
    /// Number of upcoming compare-and-swap writes that lose a race
    pub injected_conflicts: AtomicU32,
}

impl MockStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inject_conflicts(&self, n: u32) {
        self.injected_conflicts.store(n, Ordering::SeqCst);
    }

    fn take_conflict(&self) -> bool {
        self.injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    pub async fn account(&self, id: &AccountId) -> Account {
        self.accounts.lock().await.get(id).cloned().unwrap()
    }

    pub async fn session(&self, id: &SessionId) -> Session {
        self.sessions.lock().await.get(id).cloned().unwrap()
    }
}

#[async_trait]
impl AccountRepository for MockStore {
    async fn create(&self, new: NewAccount) -> Result<Account, Error> {
        let mut accounts = self.accounts.lock().await;
        if accounts.values().any(|a| a.email == new.email) {
            return Err(Error::Storage(StorageError::Constraint(
                "accounts.email".to_string(),
            )));
        }
        let account = Account::builder()
            .id(new.id)
            .email(new.email)
            .name(new.name)
            .password_hash(new.password_hash)
            .build()?;
        accounts.insert(account.id.clone(), account.clone());
        Ok(account)
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, Error> {
        Ok(self.accounts.lock().await.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, Error> {
        Ok(self
            .accounts
            .lock()
            .await
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn upsert_by_email(&self, new: NewAccount) -> Result<Account, Error> {
        let mut accounts = self.accounts.lock().await;
        if let Some(existing) = accounts.values().find(|a| a.email == new.email) {
            return Ok(existing.clone());
        }
        let account = Account::builder()
            .id(new.id)
            .email(new.email)
            .name(new.name)
            .password_hash(new.password_hash)
            .build()?;
        accounts.insert(account.id.clone(), account.clone());
        Ok(account)
    }

    async fn update_security_state(&self, account: &Account) -> Result<Account, Error> {
        let mut accounts = self.accounts.lock().await;
        let stored = accounts
            .get_mut(&account.id)
            .ok_or(Error::Storage(StorageError::NotFound))?;

        if self.take_conflict() {
            stored.revision += 1;
            return Err(Error::Storage(StorageError::Conflict));
        }
        if stored.revision != account.revision {
            return Err(Error::Storage(StorageError::Conflict));
        }

        stored.failed_attempts = account.failed_attempts;
        stored.lockout_until = account.lockout_until;
        stored.lockout_level = account.lockout_level;
        stored.disabled = account.disabled;
        stored.revision += 1;
        Ok(stored.clone())
    }

    async fn set_password_hash(&self, id: &AccountId, password_hash: &str) -> Result<(), Error> {
        let mut accounts = self.accounts.lock().await;
        let stored = accounts
            .get_mut(id)
            .ok_or(Error::Storage(StorageError::NotFound))?;
        stored.password_hash = Some(password_hash.to_string());
        stored.revision += 1;
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: &AccountId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        let mut accounts = self.accounts.lock().await;
        let stored = accounts
            .get_mut(id)
            .ok_or(Error::Storage(StorageError::NotFound))?;
        stored.reset_token_hash = Some(token_hash.to_string());
        stored.reset_token_expires_at = Some(expires_at);
        Ok(())
    }

    async fn find_by_reset_token(&self, token_hash: &str) -> Result<Option<Account>, Error> {
        Ok(self
            .accounts
            .lock()
            .await
            .values()
            .find(|a| a.reset_token_hash.as_deref() == Some(token_hash))
            .cloned())
    }

    async fn consume_reset_token(
        &self,
        token_hash: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, Error> {
        let mut accounts = self.accounts.lock().await;
        let Some(stored) = accounts.values_mut().find(|a| {
            a.reset_token_hash.as_deref() == Some(token_hash)
                && a.reset_token_expires_at.is_some_and(|e| e > now)
        }) else {
            return Ok(None);
        };

        stored.password_hash = Some(new_password_hash.to_string());
        stored.reset_token_hash = None;
        stored.reset_token_expires_at = None;
        stored.failed_attempts = 0;
        stored.lockout_until = None;
        stored.revision += 1;
        Ok(Some(stored.clone()))
    }
}

#[async_trait]
impl SessionRepository for MockStore {
    async fn create(&self, new: NewSession) -> Result<Session, Error> {
        let session = Session {
            id: new.id,
            token_hash: new.token_hash,
            account_id: new.account_id,
            user_agent: new.client.user_agent,
            ip_address: new.client.ip_address,
            login_time: new.login_time,
            logout_time: None,
            active_time_seconds: 0,
            last_update_time: None,
            revision: 0,
        };
        self.sessions
            .lock()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<Session>, Error> {
        Ok(self.sessions.lock().await.get(id).cloned())
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>, Error> {
        Ok(self
            .sessions
            .lock()
            .await
            .values()
            .find(|s| s.token_hash == token_hash)
            .cloned())
    }

    async fn record_activity(&self, session: &Session) -> Result<Session, Error> {
        let mut sessions = self.sessions.lock().await;
        let stored = sessions
            .get_mut(&session.id)
            .ok_or(Error::Storage(StorageError::NotFound))?;

        if self.take_conflict() {
            stored.revision += 1;
            return Err(Error::Storage(StorageError::Conflict));
        }
        if stored.revision != session.revision || stored.logout_time.is_some() {
            return Err(Error::Storage(StorageError::Conflict));
        }

        stored.active_time_seconds = session.active_time_seconds;
        stored.last_update_time = session.last_update_time;
        stored.revision += 1;
        Ok(stored.clone())
    }

    async fn close(&self, id: &SessionId, now: DateTime<Utc>) -> Result<bool, Error> {
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(id) {
            Some(stored) if stored.logout_time.is_none() => {
                stored.logout_time = Some(now);
                stored.revision += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn close_all_for_account(
        &self,
        account_id: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<u64, Error> {
        let mut closed = 0;
        for stored in self.sessions.lock().await.values_mut() {
            if &stored.account_id == account_id && stored.logout_time.is_none() {
                stored.logout_time = Some(now);
                stored.revision += 1;
                closed += 1;
            }
        }
        Ok(closed)
    }

    async fn total_active_seconds(&self, account_id: &AccountId) -> Result<i64, Error> {
        Ok(self
            .sessions
            .lock()
            .await
            .values()
            .filter(|s| &s.account_id == account_id)
            .map(|s| s.active_time_seconds)
            .sum())
    }
}

impl MockStore {
    async fn ranked(&self) -> Vec<LeaderboardEntry> {
        let accounts = self.accounts.lock().await;
        let sessions = self.sessions.lock().await;

        let mut totals: HashMap<AccountId, i64> = HashMap::new();
        for session in sessions.values() {
            *totals.entry(session.account_id.clone()).or_default() += session.active_time_seconds;
        }

        let mut rows: Vec<LeaderboardEntry> = totals
            .into_iter()
            .filter_map(|(id, total)| {
                accounts.get(&id).map(|a| LeaderboardEntry {
                    rank: 0,
                    account_id: id,
                    email: a.email.clone(),
                    name: a.name.clone(),
                    total_active_seconds: total,
                })
            })
            .collect();

        rows.sort_by(|a, b| {
            b.total_active_seconds
                .cmp(&a.total_active_seconds)
                .then_with(|| a.email.cmp(&b.email))
                .then_with(|| a.account_id.as_str().cmp(b.account_id.as_str()))
        });
        for (i, row) in rows.iter_mut().enumerate() {
            row.rank = i as u64 + 1;
        }
        rows
    }
}

#[async_trait]
impl LeaderboardRepository for MockStore {
    async fn count_ranked_accounts(&self) -> Result<u64, Error> {
        Ok(self.ranked().await.len() as u64)
    }

    async fn ranked_accounts(
        &self,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, Error> {
        Ok(self
            .ranked()
            .await
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}
