//! SQLite storage backend for hourglass
//!
//! ```rust,ignore
//! use hourglass_storage_sqlite::SqliteRepositoryProvider;
//!
//! let pool = sqlx::SqlitePool::connect("sqlite://hourglass.db?mode=rwc").await?;
//! let provider = SqliteRepositoryProvider::new(pool);
//! provider.migrate().await?;
//! ```
//!
//! All timestamps are stored as unix seconds.

pub mod migrations;
pub mod repositories;

pub use repositories::{
    SqliteAccountRepository, SqliteLeaderboardRepository, SqliteRepositoryProvider,
    SqliteSessionRepository,
};

use chrono::{DateTime, Utc};

/// Timestamps are stored as unix milliseconds.
pub(crate) fn to_millis(t: DateTime<Utc>) -> i64 {
    t.timestamp_millis()
}

/// Deadlines round up to the next millisecond so a stored lockout or token
/// expiry never ends before the instant that was asked for.
pub(crate) fn deadline_millis(t: DateTime<Utc>) -> i64 {
    let millis = t.timestamp_millis();
    if t.timestamp_subsec_nanos() % 1_000_000 == 0 {
        millis
    } else {
        millis + 1
    }
}

/// Convert a stored timestamp back into a `DateTime`.
///
/// Out-of-range values are clamped to the epoch rather than failing the read.
pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

pub(crate) fn from_millis_opt(ms: Option<i64>) -> Option<DateTime<Utc>> {
    ms.and_then(DateTime::from_timestamp_millis)
}
