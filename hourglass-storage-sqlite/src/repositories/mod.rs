//! Repository implementations for SQLite storage

pub mod account;
pub mod leaderboard;
pub mod session;

pub use account::SqliteAccountRepository;
pub use leaderboard::SqliteLeaderboardRepository;
pub use session::SqliteSessionRepository;

use async_trait::async_trait;
use hourglass_core::{
    Error,
    error::{StorageError, utilities::DatabaseResultExt},
    repositories::{
        AccountRepositoryProvider, LeaderboardRepositoryProvider, RepositoryProvider,
        SessionRepositoryProvider,
    },
};
use hourglass_migration::MigrationManager;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::migrations::{self, SqliteMigrationManager};

/// Repository provider implementation for SQLite
///
/// Implements every individual provider trait as well as the unified
/// [`RepositoryProvider`]. All repositories share one pool.
pub struct SqliteRepositoryProvider {
    pool: SqlitePool,
    account: Arc<SqliteAccountRepository>,
    session: Arc<SqliteSessionRepository>,
    leaderboard: Arc<SqliteLeaderboardRepository>,
}

impl SqliteRepositoryProvider {
    pub fn new(pool: SqlitePool) -> Self {
        let account = Arc::new(SqliteAccountRepository::new(pool.clone()));
        let session = Arc::new(SqliteSessionRepository::new(pool.clone()));
        let leaderboard = Arc::new(SqliteLeaderboardRepository::new(pool.clone()));

        Self {
            pool,
            account,
            session,
            leaderboard,
        }
    }

    /// Connect to `database_url` and build a provider on the new pool
    pub async fn connect(database_url: &str) -> Result<Self, Error> {
        let pool = SqlitePool::connect(database_url)
            .await
            .map_db_err("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl AccountRepositoryProvider for SqliteRepositoryProvider {
    type AccountRepo = SqliteAccountRepository;

    fn account(&self) -> &Self::AccountRepo {
        &self.account
    }
}

impl SessionRepositoryProvider for SqliteRepositoryProvider {
    type SessionRepo = SqliteSessionRepository;

    fn session(&self) -> &Self::SessionRepo {
        &self.session
    }
}

impl LeaderboardRepositoryProvider for SqliteRepositoryProvider {
    type LeaderboardRepo = SqliteLeaderboardRepository;

    fn leaderboard(&self) -> &Self::LeaderboardRepo {
        &self.leaderboard
    }
}

#[async_trait]
impl RepositoryProvider for SqliteRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        let manager = SqliteMigrationManager::new(self.pool.clone());
        manager.initialize().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to initialize migrations");
            Error::Storage(StorageError::Migration(
                "Failed to initialize migrations".to_string(),
            ))
        })?;

        manager.up(&migrations::all()).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            Error::Storage(StorageError::Migration(
                "Failed to run migrations".to_string(),
            ))
        })?;

        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_db_err("Health check failed")?;
        Ok(())
    }
}
