use crate::{
    Error, LeaderboardPage, repositories::LeaderboardRepository,
    validation::validate_pagination,
};
use std::sync::Arc;

/// Service ranking accounts by accumulated active time
pub struct LeaderboardService<R: LeaderboardRepository> {
    repository: Arc<R>,
}

impl<R: LeaderboardRepository> LeaderboardService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// One page of the leaderboard (pages are 1-based).
    ///
    /// A page past the end is empty but still reports the totals.
    pub async fn rank(&self, page: u32, per_page: u32) -> Result<LeaderboardPage, Error> {
        validate_pagination(page, per_page)?;

        let total_accounts = self.repository.count_ranked_accounts().await?;
        let rows = self
            .repository
            .ranked_accounts(LeaderboardPage::offset_for(page, per_page), per_page)
            .await?;

        Ok(LeaderboardPage {
            rows,
            page,
            per_page,
            total_pages: LeaderboardPage::total_pages_for(total_accounts, per_page),
            total_accounts,
        })
    }
}
