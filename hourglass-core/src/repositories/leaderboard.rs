use async_trait::async_trait;

use crate::{Error, LeaderboardEntry};

/// Read-only aggregation over the session ledger
#[async_trait]
pub trait LeaderboardRepository: Send + Sync + 'static {
    /// Number of accounts with at least one session
    async fn count_ranked_accounts(&self) -> Result<u64, Error>;

    /// Accounts ordered by total active seconds descending, then email and id
    /// ascending. Rows carry their absolute rank, i.e. `offset + index + 1`.
    async fn ranked_accounts(&self, offset: u64, limit: u32)
    -> Result<Vec<LeaderboardEntry>, Error>;
}
