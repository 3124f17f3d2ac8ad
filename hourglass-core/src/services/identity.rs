//! Federated login
//!
//! The provider call is the only network hop in a login besides storage, so
//! it runs under a timeout. Nothing is written until the provider has
//! answered with a verified identity.

use std::sync::Arc;
use std::time::Duration;

use crate::{
    Account, Error, IdentityProvider, ProviderError, VerifiedIdentity,
    error::AuthError,
    repositories::AccountRepository,
    storage::NewAccount,
    validation::{normalize_email, validate_email, validate_name},
};

pub struct IdentityService<R: AccountRepository> {
    repository: Arc<R>,
    provider: Arc<dyn IdentityProvider>,
    timeout: Duration,
}

impl<R: AccountRepository> IdentityService<R> {
    pub fn new(repository: Arc<R>, provider: Arc<dyn IdentityProvider>, timeout: Duration) -> Self {
        Self {
            repository,
            provider,
            timeout,
        }
    }

    /// Ask the provider who owns `authorization_code`.
    ///
    /// A refusal is [`AuthError::ProviderRejected`]; errors and timeouts are
    /// [`AuthError::ProviderUnavailable`].
    pub async fn fetch_identity(&self, authorization_code: &str) -> Result<VerifiedIdentity, Error> {
        let provider = self.provider.name();

        match tokio::time::timeout(self.timeout, self.provider.verified_identity(authorization_code))
            .await
        {
            Ok(Ok(identity)) => Ok(identity),
            Ok(Err(ProviderError::Unauthenticated)) => {
                tracing::warn!(provider, "Identity provider refused the authorization code");
                Err(Error::Auth(AuthError::ProviderRejected))
            }
            Ok(Err(ProviderError::Unavailable(reason))) => {
                tracing::error!(provider, error = %reason, "Identity provider failed");
                Err(Error::Auth(AuthError::ProviderUnavailable(reason)))
            }
            Err(_) => {
                tracing::error!(provider, timeout = ?self.timeout, "Identity provider timed out");
                Err(Error::Auth(AuthError::ProviderUnavailable(format!(
                    "no answer from {provider} within {:?}",
                    self.timeout
                ))))
            }
        }
    }

    /// Find or create the account for a verified identity.
    ///
    /// A new account has no local password and takes the provider's display
    /// name when it passes the same checks as a registered name; otherwise it
    /// is left without one. Concurrent first logins for one email yield one
    /// account.
    pub async fn resolve(&self, identity: VerifiedIdentity) -> Result<Account, Error> {
        let email = normalize_email(&identity.email);
        validate_email(&email)?;

        let name = identity
            .name
            .filter(|name| match validate_name(Some(name)) {
                Ok(()) => true,
                Err(e) => {
                    tracing::debug!(provider = self.provider.name(), error = %e, "Ignoring provider display name");
                    false
                }
            });

        let new_account = NewAccount::builder()
            .email(email)
            .name(name)
            .build()?;
        let candidate_id = new_account.id.clone();

        let account = self.repository.upsert_by_email(new_account).await?;
        if account.id == candidate_id {
            tracing::info!(account_id = %account.id, provider = self.provider.name(), "Account created from federated identity");
        }
        Ok(account)
    }
}
