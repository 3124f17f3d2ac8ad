//! SQLite implementation of the account repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hourglass_core::{
    Account, AccountId, Error,
    error::{StorageError, utilities::DatabaseResultExt},
    repositories::AccountRepository,
    storage::NewAccount,
};
use sqlx::SqlitePool;

use crate::{deadline_millis, from_millis, from_millis_opt, to_millis};

const ACCOUNT_COLUMNS: &str = "id, email, name, password_hash, failed_attempts, lockout_until, \
     lockout_level, disabled, reset_token_hash, reset_token_expires_at, revision, created_at, \
     updated_at";

pub struct SqliteAccountRepository {
    pool: SqlitePool,
}

impl SqliteAccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: &AccountId) -> Result<bool, Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE id = ?)")
            .bind(id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_db_err("Failed to check account existence")
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteAccount {
    id: String,
    email: String,
    name: Option<String>,
    password_hash: Option<String>,
    failed_attempts: i64,
    lockout_until: Option<i64>,
    lockout_level: i64,
    disabled: bool,
    reset_token_hash: Option<String>,
    reset_token_expires_at: Option<i64>,
    revision: i64,
    created_at: i64,
    updated_at: i64,
}

impl From<SqliteAccount> for Account {
    fn from(row: SqliteAccount) -> Self {
        Account {
            id: AccountId::new(&row.id),
            email: row.email,
            name: row.name,
            password_hash: row.password_hash,
            failed_attempts: u32::try_from(row.failed_attempts).unwrap_or_default(),
            lockout_until: from_millis_opt(row.lockout_until),
            lockout_level: u32::try_from(row.lockout_level).unwrap_or_default(),
            disabled: row.disabled,
            reset_token_hash: row.reset_token_hash,
            reset_token_expires_at: from_millis_opt(row.reset_token_expires_at),
            revision: row.revision,
            created_at: from_millis(row.created_at),
            updated_at: from_millis(row.updated_at),
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl AccountRepository for SqliteAccountRepository {
    async fn create(&self, account: NewAccount) -> Result<Account, Error> {
        let now = to_millis(Utc::now());

        let row = sqlx::query_as::<_, SqliteAccount>(&format!(
            r#"
            INSERT INTO accounts (id, email, name, password_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(account.id.as_str())
        .bind(&account.email)
        .bind(&account.name)
        .bind(&account.password_hash)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return Error::Storage(StorageError::Constraint("accounts.email".to_string()));
            }
            tracing::error!(error = %e, "Failed to create account");
            Error::Storage(StorageError::Database("Failed to create account".to_string()))
        })?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, Error> {
        let row = sqlx::query_as::<_, SqliteAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_db_err("Failed to find account by id")?;

        Ok(row.map(Into::into))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, Error> {
        let row = sqlx::query_as::<_, SqliteAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_db_err("Failed to find account by email")?;

        Ok(row.map(Into::into))
    }

    async fn upsert_by_email(&self, account: NewAccount) -> Result<Account, Error> {
        let now = to_millis(Utc::now());

        sqlx::query(
            r#"
            INSERT INTO accounts (id, email, name, password_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(email) DO NOTHING
            "#,
        )
        .bind(account.id.as_str())
        .bind(&account.email)
        .bind(&account.name)
        .bind(&account.password_hash)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_db_err("Failed to upsert account")?;

        self.find_by_email(&account.email)
            .await?
            .ok_or(Error::Storage(StorageError::NotFound))
    }

    async fn update_security_state(&self, account: &Account) -> Result<Account, Error> {
        let row = sqlx::query_as::<_, SqliteAccount>(&format!(
            r#"
            UPDATE accounts
            SET failed_attempts = ?, lockout_until = ?, lockout_level = ?, disabled = ?,
                revision = revision + 1, updated_at = ?
            WHERE id = ? AND revision = ?
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(i64::from(account.failed_attempts))
        .bind(account.lockout_until.map(deadline_millis))
        .bind(i64::from(account.lockout_level))
        .bind(account.disabled)
        .bind(to_millis(Utc::now()))
        .bind(account.id.as_str())
        .bind(account.revision)
        .fetch_optional(&self.pool)
        .await
        .map_db_err("Failed to update account security state")?;

        match row {
            Some(row) => Ok(row.into()),
            None if self.exists(&account.id).await? => Err(Error::Storage(StorageError::Conflict)),
            None => Err(Error::Storage(StorageError::NotFound)),
        }
    }

    async fn set_password_hash(&self, id: &AccountId, password_hash: &str) -> Result<(), Error> {
        let result = sqlx::query(
            "UPDATE accounts SET password_hash = ?, revision = revision + 1, updated_at = ? WHERE id = ?",
        )
        .bind(password_hash)
        .bind(to_millis(Utc::now()))
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_db_err("Failed to set password hash")?;

        if result.rows_affected() == 0 {
            return Err(Error::Storage(StorageError::NotFound));
        }
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: &AccountId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET reset_token_hash = ?, reset_token_expires_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(token_hash)
        .bind(deadline_millis(expires_at))
        .bind(to_millis(Utc::now()))
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_db_err("Failed to store reset token")?;

        if result.rows_affected() == 0 {
            return Err(Error::Storage(StorageError::NotFound));
        }
        Ok(())
    }

    async fn find_by_reset_token(&self, token_hash: &str) -> Result<Option<Account>, Error> {
        let row = sqlx::query_as::<_, SqliteAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE reset_token_hash = ?"
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_db_err("Failed to find account by reset token")?;

        Ok(row.map(Into::into))
    }

    async fn consume_reset_token(
        &self,
        token_hash: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, Error> {
        let row = sqlx::query_as::<_, SqliteAccount>(&format!(
            r#"
            UPDATE accounts
            SET password_hash = ?, reset_token_hash = NULL, reset_token_expires_at = NULL,
                failed_attempts = 0, lockout_until = NULL,
                revision = revision + 1, updated_at = ?
            WHERE reset_token_hash = ? AND reset_token_expires_at > ?
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(new_password_hash)
        .bind(to_millis(now))
        .bind(token_hash)
        .bind(to_millis(now))
        .fetch_optional(&self.pool)
        .await
        .map_db_err("Failed to consume reset token")?;

        Ok(row.map(Into::into))
    }
}
