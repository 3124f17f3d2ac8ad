//! Accounts and their security state
//!
//! An account is the unit the lockout engine works on. Besides identity it
//! carries everything needed to decide the next login attempt:
//!
//! | Field                    | Type               | Description                                                  |
//! | ------------------------ | ------------------ | ------------------------------------------------------------ |
//! | `id`                     | `AccountId`        | Opaque prefixed identifier (`acct_…`).                       |
//! | `email`                  | `String`           | Normalized email, unique across accounts.                    |
//! | `name`                   | `Option<String>`   | Display name.                                                |
//! | `password_hash`          | `Option<String>`   | Argon2 hash, `None` for federated-only accounts.             |
//! | `failed_attempts`        | `u32`              | Consecutive failures since the last reset of the counter.    |
//! | `lockout_until`          | `Option<DateTime>` | End of the current timed lockout.                            |
//! | `lockout_level`          | `u32`              | Number of timed lockouts served so far.                      |
//! | `disabled`               | `bool`             | Terminal; no further login is possible.                      |
//! | `reset_token_hash`       | `Option<String>`   | SHA-256 of the outstanding password-reset token.             |
//! | `reset_token_expires_at` | `Option<DateTime>` | Expiry of that token.                                        |
//! | `revision`               | `i64`              | Bumped on every security-state write.                        |
use crate::{
    Error,
    error::utilities::RequiredFieldExt,
    id::{generate_prefixed_id, validate_prefixed_id},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A unique, stable identifier for an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: &str) -> Self {
        AccountId(id.to_string())
    }

    pub fn new_random() -> Self {
        AccountId(generate_prefixed_id("acct"))
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(&self) -> bool {
        validate_prefixed_id(&self.0, "acct")
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new_random()
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub name: Option<String>,

    #[serde(skip)]
    pub password_hash: Option<String>,

    pub failed_attempts: u32,
    pub lockout_until: Option<DateTime<Utc>>,
    pub lockout_level: u32,
    pub disabled: bool,

    #[serde(skip)]
    pub reset_token_hash: Option<String>,
    #[serde(skip)]
    pub reset_token_expires_at: Option<DateTime<Utc>>,

    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn builder() -> AccountBuilder {
        AccountBuilder::default()
    }

    /// True while a timed lockout is still running at `now`.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.lockout_until.is_some_and(|until| until > now)
    }

    /// The lockout deadline, if it lies in the future.
    pub fn locked_until(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.lockout_until.filter(|until| *until > now)
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

#[derive(Default)]
pub struct AccountBuilder {
    id: Option<AccountId>,
    email: Option<String>,
    name: Option<String>,
    password_hash: Option<String>,
    failed_attempts: u32,
    lockout_until: Option<DateTime<Utc>>,
    lockout_level: u32,
    disabled: bool,
    reset_token_hash: Option<String>,
    reset_token_expires_at: Option<DateTime<Utc>>,
    revision: i64,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl AccountBuilder {
    pub fn id(mut self, id: AccountId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn email(mut self, email: String) -> Self {
        self.email = Some(email);
        self
    }

    pub fn name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn password_hash(mut self, password_hash: Option<String>) -> Self {
        self.password_hash = password_hash;
        self
    }

    pub fn failed_attempts(mut self, failed_attempts: u32) -> Self {
        self.failed_attempts = failed_attempts;
        self
    }

    pub fn lockout_until(mut self, lockout_until: Option<DateTime<Utc>>) -> Self {
        self.lockout_until = lockout_until;
        self
    }

    pub fn lockout_level(mut self, lockout_level: u32) -> Self {
        self.lockout_level = lockout_level;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn reset_token(
        mut self,
        hash: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.reset_token_hash = hash;
        self.reset_token_expires_at = expires_at;
        self
    }

    pub fn revision(mut self, revision: i64) -> Self {
        self.revision = revision;
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    pub fn build(self) -> Result<Account, Error> {
        let now = Utc::now();
        Ok(Account {
            id: self.id.unwrap_or_default(),
            email: self.email.require_field("Email")?,
            name: self.name,
            password_hash: self.password_hash,
            failed_attempts: self.failed_attempts,
            lockout_until: self.lockout_until,
            lockout_level: self.lockout_level,
            disabled: self.disabled,
            reset_token_hash: self.reset_token_hash,
            reset_token_expires_at: self.reset_token_expires_at,
            revision: self.revision,
            created_at: self.created_at.unwrap_or(now),
            updated_at: self.updated_at.unwrap_or(now),
        })
    }
}
