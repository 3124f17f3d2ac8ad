//! Backend-agnostic schema migrations
//!
//! A storage backend lists its migrations as boxed [`Migration`] values and
//! hands them to its [`MigrationManager`], which records applied versions in
//! a bookkeeping table and applies or rolls back the rest in version order.

use async_trait::async_trait;
use hourglass_core::error::StorageError;
use sqlx::Database;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Migration versions must be unique and ascending, found {version} after {previous}")]
    OutOfOrder { previous: i64, version: i64 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, MigrationError>;

impl From<MigrationError> for hourglass_core::Error {
    fn from(err: MigrationError) -> Self {
        hourglass_core::Error::Storage(StorageError::Migration(err.to_string()))
    }
}

#[async_trait]
pub trait Migration<DB: Database>: Send + Sync {
    /// Apply the schema change
    async fn up<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    /// Undo the schema change
    async fn down<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    /// Unique, ascending version used for ordering
    fn version(&self) -> i64;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    /// Unix seconds
    pub applied_at: i64,
}

/// Check that migration versions strictly increase.
pub fn validate_order<DB: Database>(migrations: &[Box<dyn Migration<DB>>]) -> Result<()> {
    for pair in migrations.windows(2) {
        let (previous, version) = (pair[0].version(), pair[1].version());
        if version <= previous {
            return Err(MigrationError::OutOfOrder { previous, version });
        }
    }
    Ok(())
}

/// Versions in `migrations` that are not in `applied`, in order.
pub fn pending_versions<DB: Database>(
    migrations: &[Box<dyn Migration<DB>>],
    applied: &[MigrationRecord],
) -> Vec<i64> {
    migrations
        .iter()
        .map(|m| m.version())
        .filter(|v| !applied.iter().any(|r| r.version == *v))
        .collect()
}

#[async_trait]
pub trait MigrationManager<DB: Database>: Send + Sync {
    fn get_migration_table_name(&self) -> &str {
        "_hourglass_migrations"
    }

    /// Create the bookkeeping table if needed
    async fn initialize(&self) -> Result<()>;

    /// Apply every migration not yet recorded
    async fn up(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    /// Roll back recorded migrations, newest first
    async fn down(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    async fn get_applied_migrations(&self) -> Result<Vec<MigrationRecord>>;

    async fn is_applied(&self, version: i64) -> Result<bool>;
}
