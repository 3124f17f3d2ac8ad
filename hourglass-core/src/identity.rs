//! Federated identity
//!
//! An [`IdentityProvider`] turns the authorization code from an OAuth callback
//! into a verified `(email, name)` pair. Redirects, client secrets and token
//! exchange are the provider's business; hourglass only sees the result.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub email: String,
    pub name: Option<String>,
}

impl VerifiedIdentity {
    pub fn new(email: impl Into<String>, name: Option<String>) -> Self {
        Self {
            email: email.into(),
            name,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider refused the code (denied consent, replayed code, …)
    #[error("identity provider did not authenticate the user")]
    Unauthenticated,

    /// The provider could not be reached or answered garbage
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Short provider name used in logs (`"google"`, `"github"`)
    fn name(&self) -> &str;

    /// Exchange `authorization_code` for the user's verified identity
    async fn verified_identity(
        &self,
        authorization_code: &str,
    ) -> Result<VerifiedIdentity, ProviderError>;
}
