use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{AccountId, Error, Session, SessionId, storage::NewSession};

/// Repository for the session ledger
///
/// Rows are never deleted. Closing sets `logout_time` once; activity writes are
/// a compare-and-swap on [`Session::revision`] and only apply to open sessions.
#[async_trait]
pub trait SessionRepository: Send + Sync + 'static {
    async fn create(&self, session: NewSession) -> Result<Session, Error>;

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<Session>, Error>;

    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>, Error>;

    /// Persist `active_time_seconds` and `last_update_time` from `session`
    /// if it is still open and its revision is unchanged.
    async fn record_activity(&self, session: &Session) -> Result<Session, Error>;

    /// Set `logout_time` if it is not set yet.
    ///
    /// Returns `true` if this call closed the session, `false` if it was
    /// already closed or does not exist.
    async fn close(&self, id: &SessionId, now: DateTime<Utc>) -> Result<bool, Error>;

    /// Close every open session of an account, returning how many were closed
    async fn close_all_for_account(
        &self,
        account_id: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<u64, Error>;

    /// Sum of active time over all of the account's sessions, open or closed
    async fn total_active_seconds(&self, account_id: &AccountId) -> Result<i64, Error>;
}
