//! Repository traits for the data access layer
//!
//! Services talk to storage only through these traits.
//!
//! # Trait Hierarchy
//!
//! - `*Repository` traits define the operations for each data domain
//! - `*RepositoryProvider` traits hand out the concrete repository of a backend
//! - [`RepositoryProvider`] combines the providers with lifecycle methods
//!
//! Services are generic over the individual `*Repository` traits; the
//! `*RepositoryAdapter` types bridge a shared `Arc<R: RepositoryProvider>` to
//! them.

pub mod account;
pub mod adapter;
pub mod leaderboard;
pub mod session;

pub use account::AccountRepository;
pub use adapter::{AccountRepositoryAdapter, LeaderboardRepositoryAdapter, SessionRepositoryAdapter};
pub use leaderboard::LeaderboardRepository;
pub use session::SessionRepository;

use async_trait::async_trait;

use crate::Error;

pub trait AccountRepositoryProvider: Send + Sync + 'static {
    type AccountRepo: AccountRepository;

    fn account(&self) -> &Self::AccountRepo;
}

pub trait SessionRepositoryProvider: Send + Sync + 'static {
    type SessionRepo: SessionRepository;

    fn session(&self) -> &Self::SessionRepo;
}

pub trait LeaderboardRepositoryProvider: Send + Sync + 'static {
    type LeaderboardRepo: LeaderboardRepository;

    fn leaderboard(&self) -> &Self::LeaderboardRepo;
}

/// Everything a storage backend has to provide.
///
/// # Example
///
/// ```rust,ignore
/// use hourglass_core::repositories::*;
///
/// struct MyStorage { /* ... */ }
///
/// impl AccountRepositoryProvider for MyStorage {
///     type AccountRepo = MyAccountRepository;
///     fn account(&self) -> &Self::AccountRepo { &self.accounts }
/// }
///
/// // ... session and leaderboard providers ...
///
/// #[async_trait]
/// impl RepositoryProvider for MyStorage {
///     async fn migrate(&self) -> Result<(), Error> { /* ... */ }
///     async fn health_check(&self) -> Result<(), Error> { /* ... */ }
/// }
/// ```
#[async_trait]
pub trait RepositoryProvider:
    AccountRepositoryProvider + SessionRepositoryProvider + LeaderboardRepositoryProvider
{
    /// Bring the schema up to date
    async fn migrate(&self) -> Result<(), Error>;

    /// Cheap round trip to the backing store
    async fn health_check(&self) -> Result<(), Error>;
}
