//! Repository trait for accounts and their security state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{Account, AccountId, Error, storage::NewAccount};

/// Repository for account data access
///
/// # Concurrency
///
/// Writes to the lockout fields go through [`update_security_state`], a
/// compare-and-swap on [`Account::revision`]. Implementations must bump the
/// revision on every successful write and report a lost race as
/// [`StorageError::Conflict`](crate::error::StorageError::Conflict).
///
/// [`update_security_state`]: AccountRepository::update_security_state
#[async_trait]
pub trait AccountRepository: Send + Sync + 'static {
    /// Insert a new account.
    ///
    /// A duplicate email is reported as
    /// [`StorageError::Constraint`](crate::error::StorageError::Constraint).
    async fn create(&self, account: NewAccount) -> Result<Account, Error>;

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, Error>;

    /// Look up an account by its normalized email
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, Error>;

    /// Insert the account unless one with the same email exists, then return
    /// whichever row owns the email.
    ///
    /// Must be a single atomic operation on the unique email so concurrent
    /// first-time logins cannot create two accounts.
    async fn upsert_by_email(&self, account: NewAccount) -> Result<Account, Error>;

    /// Persist `failed_attempts`, `lockout_until`, `lockout_level` and
    /// `disabled` from `account`, provided the stored revision still equals
    /// `account.revision`. Returns the account with its new revision.
    async fn update_security_state(&self, account: &Account) -> Result<Account, Error>;

    /// Replace the stored password hash
    async fn set_password_hash(&self, id: &AccountId, password_hash: &str) -> Result<(), Error>;

    /// Store the hash of a freshly issued reset token, replacing any
    /// outstanding one
    async fn set_reset_token(
        &self,
        id: &AccountId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), Error>;

    /// Find the account holding a reset token with this hash, expired or not
    async fn find_by_reset_token(&self, token_hash: &str) -> Result<Option<Account>, Error>;

    /// Atomically redeem a reset token.
    ///
    /// In one guarded write: the token must still be stored and unexpired at
    /// `now`; the password hash is replaced, the token cleared and the timed
    /// lockout lifted (`failed_attempts = 0`, `lockout_until = NULL`).
    /// Returns `None` when no unexpired token with this hash exists.
    async fn consume_reset_token(
        &self,
        token_hash: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, Error>;
}
