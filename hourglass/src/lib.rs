//! # Hourglass
//!
//! Hourglass authenticates users and keeps an honest record of how long they
//! actually spend signed in. It combines:
//!
//! - password login with progressive lockout (1 minute, 1 hour, 24 hours,
//!   then the account is disabled),
//! - optional federated login through any [`IdentityProvider`],
//! - password reset by emailed single-use token,
//! - a session ledger whose active time only grows by amounts the server can
//!   account for in wall-clock time,
//! - a paginated leaderboard over that active time.
//!
//! ## Storage Support
//!
//! - SQLite (feature `sqlite`, enabled by default)
//!
//! Other backends implement [`RepositoryProvider`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use hourglass::{ClientContext, Hourglass, SqliteRepositoryProvider};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = sqlx::SqlitePool::connect("sqlite::memory:").await?;
//!     let hourglass = Hourglass::new(Arc::new(SqliteRepositoryProvider::new(pool)));
//!     hourglass.migrate().await?;
//!
//!     hourglass.register("ada@example.com", "correct horse", None).await?;
//!     let login = hourglass
//!         .login_with_password("ada@example.com", "correct horse", None, ClientContext::default())
//!         .await?;
//!
//!     let receipt = hourglass.record_activity(&login.token, 0).await?;
//!     println!("active for {}s", receipt.total_active_seconds);
//!     Ok(())
//! }
//! ```
use std::sync::Arc;

use chrono::Utc;
use hourglass_core::{
    repositories::{
        AccountRepositoryAdapter, LeaderboardRepositoryAdapter, SessionRepository,
        SessionRepositoryAdapter, SessionRepositoryProvider,
    },
    services::{
        AccountService, IdentityService, LeaderboardService, LockoutService,
        PasswordResetService, SessionService,
    },
};

pub mod builder;
mod config;

pub use builder::{HourglassBuilder, HourglassBuilderError};
pub use config::HourglassConfig;

/// Re-export core types from hourglass_core
pub use hourglass_core::{
    Account, AccountId, ActivityPolicy, ActivityRejection, AttemptOutcome, ClientContext, Error,
    IdentityProvider, LeaderboardEntry, LeaderboardPage, LockoutPolicy, ProviderError,
    ResetConfig, Session, SessionConfig, SessionId, SessionToken, VerifiedIdentity,
    error::{AuthError, SessionError, StorageError, ValidationError},
    repositories::RepositoryProvider,
    services::{ActivityReceipt, MailerService, ResetTokenStatus, TracingMailer},
};

/// Re-export storage backends
#[cfg(feature = "sqlite")]
pub use hourglass_storage_sqlite::SqliteRepositoryProvider;

/// Errors returned by [`Hourglass`].
#[derive(Debug, thiserror::Error)]
pub enum HourglassError {
    #[error(transparent)]
    Core(#[from] hourglass_core::Error),

    /// Federated login was attempted without an identity provider
    #[error("Federated login is not configured")]
    FederationNotConfigured,
}

impl HourglassError {
    /// The underlying domain error, if any
    pub fn core(&self) -> Option<&hourglass_core::Error> {
        match self {
            HourglassError::Core(e) => Some(e),
            HourglassError::FederationNotConfigured => None,
        }
    }
}

/// A session that was just opened or continued by a login.
#[derive(Debug, Clone)]
pub struct Login {
    pub account: Account,
    pub session: Session,
    /// Bearer token to hand to the client; equal to the presented token when
    /// an existing session was continued
    pub token: SessionToken,
}

type Accounts<R> = AccountRepositoryAdapter<R>;

/// The coordinator that wires services to a storage backend.
///
/// All operations take the current time from the system clock; the services
/// underneath accept explicit timestamps for callers that need control.
pub struct Hourglass<R: RepositoryProvider> {
    repositories: Arc<R>,
    account_service: Arc<AccountService<Accounts<R>>>,
    lockout_service: Arc<LockoutService<Accounts<R>>>,
    session_service: Arc<SessionService<SessionRepositoryAdapter<R>>>,
    reset_service: Arc<PasswordResetService<Accounts<R>>>,
    leaderboard_service: Arc<LeaderboardService<LeaderboardRepositoryAdapter<R>>>,
    identity_service: Option<Arc<IdentityService<Accounts<R>>>>,
    mailer: Arc<dyn MailerService>,
    identity_provider: Option<Arc<dyn IdentityProvider>>,
    config: HourglassConfig,
}

impl<R: RepositoryProvider> Hourglass<R> {
    /// Create an instance with the default configuration and a
    /// [`TracingMailer`].
    pub fn new(repositories: Arc<R>) -> Self {
        Self::wire(
            repositories,
            HourglassConfig::default(),
            Arc::new(TracingMailer),
            None,
        )
    }

    fn wire(
        repositories: Arc<R>,
        config: HourglassConfig,
        mailer: Arc<dyn MailerService>,
        identity_provider: Option<Arc<dyn IdentityProvider>>,
    ) -> Self {
        let accounts = Arc::new(AccountRepositoryAdapter::new(repositories.clone()));
        let sessions = Arc::new(SessionRepositoryAdapter::new(repositories.clone()));
        let leaderboard = Arc::new(LeaderboardRepositoryAdapter::new(repositories.clone()));

        let identity_service = identity_provider.clone().map(|provider| {
            Arc::new(IdentityService::new(
                accounts.clone(),
                provider,
                config.provider_timeout,
            ))
        });

        Self {
            account_service: Arc::new(AccountService::new(accounts.clone())),
            lockout_service: Arc::new(LockoutService::new(
                accounts.clone(),
                config.lockout.clone(),
            )),
            session_service: Arc::new(SessionService::new(
                sessions,
                config.session.clone(),
                config.activity.clone(),
            )),
            reset_service: Arc::new(PasswordResetService::new(
                accounts,
                mailer.clone(),
                config.reset.clone(),
            )),
            leaderboard_service: Arc::new(LeaderboardService::new(leaderboard)),
            identity_service,
            repositories,
            mailer,
            identity_provider,
            config,
        }
    }

    pub fn with_config(self, config: HourglassConfig) -> Self {
        Self::wire(
            self.repositories,
            config,
            self.mailer,
            self.identity_provider,
        )
    }

    pub fn with_mailer(self, mailer: Arc<dyn MailerService>) -> Self {
        Self::wire(
            self.repositories,
            self.config,
            mailer,
            self.identity_provider,
        )
    }

    /// Enable federated login through `provider`
    pub fn with_identity_provider(self, provider: Arc<dyn IdentityProvider>) -> Self {
        Self::wire(self.repositories, self.config, self.mailer, Some(provider))
    }

    pub fn config(&self) -> &HourglassConfig {
        &self.config
    }

    /// Run migrations for all repositories
    pub async fn migrate(&self) -> Result<(), HourglassError> {
        Ok(self.repositories.migrate().await?)
    }

    /// Health check for all repositories
    pub async fn health_check(&self) -> Result<(), HourglassError> {
        Ok(self.repositories.health_check().await?)
    }

    /// Create an account with a local password
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> Result<Account, HourglassError> {
        Ok(self.account_service.register(email, password, name).await?)
    }

    pub async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, HourglassError> {
        Ok(self.account_service.get_account(id).await?)
    }

    /// Give an account a new local password.
    ///
    /// Lets a federated-only account sign in with a password from now on.
    pub async fn set_password(
        &self,
        id: &AccountId,
        password: &str,
    ) -> Result<(), HourglassError> {
        Ok(self.account_service.set_password(id, password).await?)
    }

    /// Check a password and open a session, or continue `presented` if it is
    /// still an open session of the same account.
    ///
    /// Failed attempts count towards the account's lockout.
    pub async fn login_with_password(
        &self,
        email: &str,
        password: &str,
        presented: Option<&SessionToken>,
        client: ClientContext,
    ) -> Result<Login, HourglassError> {
        let now = Utc::now();
        let account = self
            .lockout_service
            .authenticate(email, password, now)
            .await?;

        let (session, token) = self
            .session_service
            .continue_or_open(&account.id, presented, client, now)
            .await?;

        Ok(Login {
            account,
            session,
            token,
        })
    }

    /// Complete a federated login with the provider's authorization code.
    ///
    /// Creates the account on first login. Locked and disabled accounts are
    /// refused exactly as for a password login.
    pub async fn login_federated(
        &self,
        authorization_code: &str,
        presented: Option<&SessionToken>,
        client: ClientContext,
    ) -> Result<Login, HourglassError> {
        let identity_service = self
            .identity_service
            .as_ref()
            .ok_or(HourglassError::FederationNotConfigured)?;

        let identity = identity_service.fetch_identity(authorization_code).await?;
        let account = identity_service.resolve(identity).await?;

        let now = Utc::now();
        let account = self.lockout_service.admit(account, now).await?;

        let (session, token) = self
            .session_service
            .continue_or_open(&account.id, presented, client, now)
            .await?;
        tracing::info!(account_id = %account.id, session_id = %session.id, "Federated login");

        Ok(Login {
            account,
            session,
            token,
        })
    }

    /// Resolve a bearer token to its open session.
    pub async fn authenticate_session(
        &self,
        token: &SessionToken,
    ) -> Result<Session, HourglassError> {
        Ok(self.session_service.authenticate(token, Utc::now()).await?)
    }

    /// Close the session behind `token`. Logging out twice is fine.
    pub async fn logout(&self, token: &SessionToken) -> Result<(), HourglassError> {
        let session = self
            .repositories
            .session()
            .find_by_token_hash(&token.hash())
            .await?
            .ok_or(hourglass_core::Error::Session(SessionError::NotFound))?;

        Ok(self.session_service.close(&session.id, Utc::now()).await?)
    }

    /// Apply a client activity report to the session behind `token`.
    pub async fn record_activity(
        &self,
        token: &SessionToken,
        active_seconds: i64,
    ) -> Result<ActivityReceipt, HourglassError> {
        let now = Utc::now();
        let session = self.session_service.authenticate(token, now).await?;

        Ok(self
            .session_service
            .record_activity(&session.id, active_seconds, now)
            .await?)
    }

    /// Active time summed over all of an account's sessions
    pub async fn total_active_seconds(&self, id: &AccountId) -> Result<i64, HourglassError> {
        Ok(self.session_service.total_active_seconds(id).await?)
    }

    pub async fn leaderboard(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<LeaderboardPage, HourglassError> {
        Ok(self.leaderboard_service.rank(page, per_page).await?)
    }

    /// Mail a reset link to `email` if it belongs to an active account.
    ///
    /// Succeeds whether or not the account exists.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), HourglassError> {
        Ok(self.reset_service.request_reset(email, Utc::now()).await?)
    }

    /// Check a reset token without consuming it
    pub async fn verify_reset_token(
        &self,
        token: &str,
    ) -> Result<ResetTokenStatus, HourglassError> {
        Ok(self.reset_service.verify(token, Utc::now()).await?)
    }

    /// Redeem a reset token and set a new password.
    ///
    /// Also lifts a timed lockout and closes every open session of the
    /// account, so sessions opened by whoever knew the old password end here.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<Account, HourglassError> {
        let now = Utc::now();
        let account = self
            .reset_service
            .reset_password(token, new_password, now)
            .await?;

        let closed = self
            .session_service
            .close_all_for_account(&account.id, now)
            .await?;
        tracing::info!(account_id = %account.id, closed_sessions = closed, "Password reset");

        Ok(account)
    }
}
