use serde::{Deserialize, Serialize};

use crate::account::AccountId;

/// One ranked account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based position across the whole board, not just this page
    pub rank: u64,
    pub account_id: AccountId,
    pub email: String,
    pub name: Option<String>,
    pub total_active_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardPage {
    pub rows: Vec<LeaderboardEntry>,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u64,
    /// Accounts with at least one session
    pub total_accounts: u64,
}

impl LeaderboardPage {
    pub fn total_pages_for(total_accounts: u64, per_page: u32) -> u64 {
        total_accounts.div_ceil(u64::from(per_page.max(1)))
    }

    pub fn offset_for(page: u32, per_page: u32) -> u64 {
        u64::from(page.saturating_sub(1)) * u64::from(per_page)
    }
}
