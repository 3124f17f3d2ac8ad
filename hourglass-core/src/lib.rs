//! Core functionality for the hourglass project
//!
//! This crate holds the account-security state machine and the session
//! accounting model. It contains the domain structs, the pure decision logic
//! (see [`LockoutPolicy`] and [`ActivityPolicy`]), the repository traits that
//! storage backends implement, and the services that combine the two.
//!
//! It does not ship a storage backend. See `hourglass-storage-sqlite` for one,
//! and the `hourglass` crate for the facade most applications should use.
pub mod account;
pub mod activity;
pub mod config;
pub mod crypto;
pub mod error;
pub mod id;
pub mod identity;
pub mod leaderboard;
pub mod lockout;
pub mod repositories;
pub mod services;
pub mod session;
pub mod storage;
pub mod validation;

pub use account::{Account, AccountId};
pub use activity::{ActivityPolicy, ActivityRejection};
pub use config::{ResetConfig, SessionConfig};
pub use error::Error;
pub use identity::{IdentityProvider, ProviderError, VerifiedIdentity};
pub use leaderboard::{LeaderboardEntry, LeaderboardPage};
pub use lockout::{AttemptOutcome, LockoutPolicy};
pub use session::{ClientContext, Session, SessionId, SessionToken};
pub use storage::{NewAccount, NewSession};
