//! SQLite implementation of the session ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hourglass_core::{
    AccountId, Error, Session, SessionId,
    error::{StorageError, utilities::DatabaseResultExt},
    repositories::SessionRepository,
    storage::NewSession,
};
use sqlx::SqlitePool;

use crate::{from_millis, from_millis_opt, to_millis};

const SESSION_COLUMNS: &str = "id, token_hash, account_id, user_agent, ip_address, login_time, \
     logout_time, active_time_seconds, last_update_time, revision";

pub struct SqliteSessionRepository {
    pool: SqlitePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteSession {
    id: String,
    token_hash: String,
    account_id: String,
    user_agent: Option<String>,
    ip_address: Option<String>,
    login_time: i64,
    logout_time: Option<i64>,
    active_time_seconds: i64,
    last_update_time: Option<i64>,
    revision: i64,
}

impl From<SqliteSession> for Session {
    fn from(row: SqliteSession) -> Self {
        Session {
            id: SessionId::new(&row.id),
            token_hash: row.token_hash,
            account_id: AccountId::new(&row.account_id),
            user_agent: row.user_agent,
            ip_address: row.ip_address,
            login_time: from_millis(row.login_time),
            logout_time: from_millis_opt(row.logout_time),
            active_time_seconds: row.active_time_seconds,
            last_update_time: from_millis_opt(row.last_update_time),
            revision: row.revision,
        }
    }
}

#[async_trait]
impl SessionRepository for SqliteSessionRepository {
    async fn create(&self, session: NewSession) -> Result<Session, Error> {
        let row = sqlx::query_as::<_, SqliteSession>(&format!(
            r#"
            INSERT INTO sessions (id, token_hash, account_id, user_agent, ip_address, login_time)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(session.id.as_str())
        .bind(&session.token_hash)
        .bind(session.account_id.as_str())
        .bind(&session.client.user_agent)
        .bind(&session.client.ip_address)
        .bind(to_millis(session.login_time))
        .fetch_one(&self.pool)
        .await
        .map_db_err("Failed to create session")?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<Session>, Error> {
        let row = sqlx::query_as::<_, SqliteSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_db_err("Failed to find session")?;

        Ok(row.map(Into::into))
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>, Error> {
        let row = sqlx::query_as::<_, SqliteSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE token_hash = ?"
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_db_err("Failed to find session by token")?;

        Ok(row.map(Into::into))
    }

    async fn record_activity(&self, session: &Session) -> Result<Session, Error> {
        let row = sqlx::query_as::<_, SqliteSession>(&format!(
            r#"
            UPDATE sessions
            SET active_time_seconds = ?, last_update_time = ?, revision = revision + 1
            WHERE id = ? AND revision = ? AND logout_time IS NULL
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(session.active_time_seconds)
        .bind(session.last_update_time.map(to_millis))
        .bind(session.id.as_str())
        .bind(session.revision)
        .fetch_optional(&self.pool)
        .await
        .map_db_err("Failed to record session activity")?;

        if let Some(row) = row {
            return Ok(row.into());
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM sessions WHERE id = ?)")
            .bind(session.id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_db_err("Failed to check session existence")?;

        if exists {
            Err(Error::Storage(StorageError::Conflict))
        } else {
            Err(Error::Storage(StorageError::NotFound))
        }
    }

    async fn close(&self, id: &SessionId, now: DateTime<Utc>) -> Result<bool, Error> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET logout_time = ?, revision = revision + 1
            WHERE id = ? AND logout_time IS NULL
            "#,
        )
        .bind(to_millis(now))
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_db_err("Failed to close session")?;

        Ok(result.rows_affected() == 1)
    }

    async fn close_all_for_account(
        &self,
        account_id: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET logout_time = ?, revision = revision + 1
            WHERE account_id = ? AND logout_time IS NULL
            "#,
        )
        .bind(to_millis(now))
        .bind(account_id.as_str())
        .execute(&self.pool)
        .await
        .map_db_err("Failed to close account sessions")?;

        Ok(result.rows_affected())
    }

    async fn total_active_seconds(&self, account_id: &AccountId) -> Result<i64, Error> {
        sqlx::query_scalar(
            "SELECT COALESCE(SUM(active_time_seconds), 0) FROM sessions WHERE account_id = ?",
        )
        .bind(account_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_db_err("Failed to sum active time")
    }
}
