//! Session ledger entries
//!
//! A session is one continuous authenticated interval for one account on one
//! client. Sessions are opened at login, accumulate active time through
//! reconciled activity reports, and are closed once (logout, timeout or a
//! password reset). Closed sessions are kept forever; they feed the
//! leaderboard.
//!
//! | Field                 | Type               | Description                                          |
//! | --------------------- | ------------------ | ---------------------------------------------------- |
//! | `id`                  | `SessionId`        | Opaque prefixed identifier (`sess_…`).               |
//! | `account_id`          | `AccountId`        | Owner of the session.                                |
//! | `user_agent`          | `Option<String>`   | User agent of the client that logged in.             |
//! | `ip_address`          | `Option<String>`   | IP address of the client that logged in.             |
//! | `login_time`          | `DateTime`         | Set at creation, never changes.                      |
//! | `logout_time`         | `Option<DateTime>` | Set once when the session is closed.                 |
//! | `active_time_seconds` | `i64`              | Accepted active time; frozen after close.            |
//! | `last_update_time`    | `Option<DateTime>` | Baseline for the next activity report.               |
//! | `revision`            | `i64`              | Bumped on every write.                               |

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    account::AccountId,
    crypto::{generate_secure_token, hash_token, verify_token_hash},
    id::{generate_prefixed_id, validate_prefixed_id},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: &str) -> Self {
        SessionId(id.to_string())
    }

    pub fn new_random() -> Self {
        SessionId(generate_prefixed_id("sess"))
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(&self) -> bool {
        validate_prefixed_id(&self.0, "sess")
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new_random()
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque bearer token handed to the client when a session is opened
///
/// The plaintext exists only in the login response and in the client's
/// cookie; the ledger stores [`SessionToken::hash`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: &str) -> Self {
        SessionToken(token.to_string())
    }

    /// A fresh token with 256 bits of entropy
    pub fn new_random() -> Self {
        SessionToken(generate_secure_token())
    }

    /// SHA-256 of the token, the form kept in storage
    pub fn hash(&self) -> String {
        hash_token(&self.0)
    }

    pub fn matches_hash(&self, stored_hash: &str) -> bool {
        verify_token_hash(&self.0, stored_hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for SessionToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionToken {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Where a login came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientContext {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl ClientContext {
    pub fn new(user_agent: Option<String>, ip_address: Option<String>) -> Self {
        Self {
            user_agent,
            ip_address,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    #[serde(skip)]
    pub token_hash: String,
    pub account_id: AccountId,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub login_time: DateTime<Utc>,
    pub logout_time: Option<DateTime<Utc>>,
    pub active_time_seconds: i64,
    pub last_update_time: Option<DateTime<Utc>>,
    pub revision: i64,
}

impl Session {
    pub fn is_open(&self) -> bool {
        self.logout_time.is_none()
    }

    /// The instant the next activity delta is measured from.
    pub fn baseline(&self) -> DateTime<Utc> {
        self.last_update_time.unwrap_or(self.login_time)
    }

    /// True once more than `limit` has passed since login.
    ///
    /// The comparison is strict: a session exactly `limit` old is still valid.
    pub fn is_timed_out(&self, now: DateTime<Utc>, limit: Duration) -> bool {
        now - self.login_time > limit
    }
}
