//! SQLite implementation of the leaderboard aggregation.

use async_trait::async_trait;
use hourglass_core::{
    AccountId, Error, LeaderboardEntry, error::utilities::DatabaseResultExt,
    repositories::LeaderboardRepository,
};
use sqlx::SqlitePool;

pub struct SqliteLeaderboardRepository {
    pool: SqlitePool,
}

impl SqliteLeaderboardRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteRankedAccount {
    id: String,
    email: String,
    name: Option<String>,
    total_active_seconds: i64,
}

#[async_trait]
impl LeaderboardRepository for SqliteLeaderboardRepository {
    async fn count_ranked_accounts(&self) -> Result<u64, Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT s.account_id)
            FROM sessions s
            JOIN accounts a ON a.id = s.account_id
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_db_err("Failed to count ranked accounts")?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn ranked_accounts(
        &self,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, Error> {
        let rows = sqlx::query_as::<_, SqliteRankedAccount>(
            r#"
            SELECT a.id, a.email, a.name, SUM(s.active_time_seconds) AS total_active_seconds
            FROM accounts a
            JOIN sessions s ON s.account_id = a.id
            GROUP BY a.id, a.email, a.name
            ORDER BY total_active_seconds DESC, a.email ASC, a.id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(i64::from(limit))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_db_err("Failed to rank accounts")?;

        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| LeaderboardEntry {
                rank: offset + i as u64 + 1,
                account_id: AccountId::new(&row.id),
                email: row.email,
                name: row.name,
                total_active_seconds: row.total_active_seconds,
            })
            .collect())
    }
}
