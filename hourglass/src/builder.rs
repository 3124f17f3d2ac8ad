//! Builder pattern for constructing Hourglass instances
//!
//! The builder is type-state checked: storage has to be configured before
//! [`HourglassBuilder::build`] becomes available.
//!
//! # Example
//!
//! ```rust,no_run
//! use hourglass::{HourglassBuilder, HourglassConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hourglass = HourglassBuilder::new()
//!         .with_config(HourglassConfig::from_env())
//!         .with_sqlite("sqlite::memory:")
//!         .await?
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     hourglass.health_check().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use hourglass_core::{IdentityProvider, repositories::RepositoryProvider, services::MailerService};

use crate::{Hourglass, HourglassConfig};

/// Errors that can occur when building a Hourglass instance.
#[derive(Debug, thiserror::Error)]
pub enum HourglassBuilderError {
    /// Failed to connect to storage backend
    #[error("Storage connection failed: {0}")]
    StorageConnection(String),

    /// Failed to run database migrations
    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Marker type indicating no storage has been configured yet.
pub struct NoStorage;

/// Marker type indicating storage has been configured.
pub struct WithStorage<R: RepositoryProvider> {
    repositories: Arc<R>,
}

/// A type-safe builder for [`Hourglass`].
pub struct HourglassBuilder<Storage> {
    storage: Storage,
    config: HourglassConfig,
    mailer: Option<Arc<dyn MailerService>>,
    identity_provider: Option<Arc<dyn IdentityProvider>>,
    apply_migrations: bool,
}

impl Default for HourglassBuilder<NoStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl HourglassBuilder<NoStorage> {
    /// Create a new builder with default configuration.
    ///
    /// # Defaults
    ///
    /// - Configuration: [`HourglassConfig::default`]
    /// - Mailer: [`TracingMailer`](crate::TracingMailer)
    /// - Federated login: disabled
    /// - Apply migrations: false
    pub fn new() -> Self {
        Self {
            storage: NoStorage,
            config: HourglassConfig::default(),
            mailer: None,
            identity_provider: None,
            apply_migrations: false,
        }
    }

    /// Use an already constructed repository provider
    pub fn with_repositories<R: RepositoryProvider>(
        self,
        repositories: Arc<R>,
    ) -> HourglassBuilder<WithStorage<R>> {
        self.into_storage(WithStorage { repositories })
    }

    fn into_storage<S>(self, storage: S) -> HourglassBuilder<S> {
        HourglassBuilder {
            storage,
            config: self.config,
            mailer: self.mailer,
            identity_provider: self.identity_provider,
            apply_migrations: self.apply_migrations,
        }
    }
}

#[cfg(feature = "sqlite")]
impl HourglassBuilder<NoStorage> {
    /// Configure SQLite storage by connecting to the given URL.
    ///
    /// # Arguments
    ///
    /// * `url` - SQLite connection URL (e.g., "sqlite::memory:" or "sqlite://hourglass.db?mode=rwc")
    pub async fn with_sqlite(
        self,
        url: &str,
    ) -> Result<
        HourglassBuilder<WithStorage<crate::SqliteRepositoryProvider>>,
        HourglassBuilderError,
    > {
        let provider = crate::SqliteRepositoryProvider::connect(url)
            .await
            .map_err(|e| HourglassBuilderError::StorageConnection(e.to_string()))?;

        Ok(self.with_repositories(Arc::new(provider)))
    }

    /// Configure SQLite storage with an existing connection pool.
    pub fn with_sqlite_pool(
        self,
        pool: sqlx::SqlitePool,
    ) -> HourglassBuilder<WithStorage<crate::SqliteRepositoryProvider>> {
        self.with_repositories(Arc::new(crate::SqliteRepositoryProvider::new(pool)))
    }
}

impl<S> HourglassBuilder<S> {
    pub fn with_config(mut self, config: HourglassConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn MailerService>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.identity_provider = Some(provider);
        self
    }

    /// Run pending migrations during [`build`](HourglassBuilder::build)
    pub fn apply_migrations(mut self, apply: bool) -> Self {
        self.apply_migrations = apply;
        self
    }
}

impl<R: RepositoryProvider> HourglassBuilder<WithStorage<R>> {
    pub async fn build(self) -> Result<Hourglass<R>, HourglassBuilderError> {
        let repositories = self.storage.repositories;

        if self.apply_migrations {
            repositories
                .migrate()
                .await
                .map_err(|e| HourglassBuilderError::Migration(e.to_string()))?;
        }

        let mut hourglass = Hourglass::new(repositories).with_config(self.config);
        if let Some(mailer) = self.mailer {
            hourglass = hourglass.with_mailer(mailer);
        }
        if let Some(provider) = self.identity_provider {
            hourglass = hourglass.with_identity_provider(provider);
        }

        Ok(hourglass)
    }
}
