//! Password reset tokens
//!
//! A reset token is 256 bits of randomness handed to the account owner by
//! email. Only its SHA-256 hash and expiry live on the account row, so at most
//! one token is outstanding per account and issuing a new one voids the old.
//! Redeeming a token is a single guarded write, which makes it single-use even
//! under concurrent redemption.

use crate::{
    Account, Error, ResetConfig,
    crypto::{generate_secure_token, hash_password, hash_token},
    error::AuthError,
    repositories::AccountRepository,
    services::MailerService,
    validation::{normalize_email, validate_password},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// What a presented reset token currently refers to
#[derive(Debug, Clone)]
pub enum ResetTokenStatus {
    Valid(Account),
    Expired,
    Invalid,
}

impl ResetTokenStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, ResetTokenStatus::Valid(_))
    }
}

pub struct PasswordResetService<R: AccountRepository> {
    repository: Arc<R>,
    mailer: Arc<dyn MailerService>,
    config: ResetConfig,
}

impl<R: AccountRepository> PasswordResetService<R> {
    pub fn new(repository: Arc<R>, mailer: Arc<dyn MailerService>, config: ResetConfig) -> Self {
        Self {
            repository,
            mailer,
            config,
        }
    }

    pub fn config(&self) -> &ResetConfig {
        &self.config
    }

    /// Issue a fresh token for `account`, replacing any outstanding one.
    pub async fn issue(&self, account: &Account, now: DateTime<Utc>) -> Result<String, Error> {
        let token = generate_secure_token();
        let expires_at = now + self.config.token_lifetime;

        self.repository
            .set_reset_token(&account.id, &hash_token(&token), expires_at)
            .await?;

        tracing::info!(account_id = %account.id, %expires_at, "Password reset token issued");
        Ok(token)
    }

    /// Start a reset for `email`.
    ///
    /// Always succeeds so the caller cannot tell whether the email is
    /// registered. Unknown and disabled accounts get no token. A failed mail
    /// delivery is logged; the token stays issued.
    pub async fn request_reset(&self, email: &str, now: DateTime<Utc>) -> Result<(), Error> {
        let email = normalize_email(email);

        let Some(account) = self.repository.find_by_email(&email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        if account.disabled {
            tracing::info!(account_id = %account.id, "Password reset requested for disabled account");
            return Ok(());
        }

        let token = self.issue(&account, now).await?;
        let body = format!(
            "Someone asked to reset the password for this account.\n\n\
             Follow this link within {} minutes to choose a new one:\n{}\n\n\
             If this wasn't you, you can ignore this email.",
            self.config.token_lifetime.num_minutes(),
            self.config.reset_link(&token),
        );

        if let Err(e) = self
            .mailer
            .send(&account.email, "Reset your password", &body)
            .await
        {
            tracing::error!(account_id = %account.id, error = %e, "Failed to send password reset email");
        }

        Ok(())
    }

    /// Check a token without consuming it.
    pub async fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<ResetTokenStatus, Error> {
        let Some(account) = self
            .repository
            .find_by_reset_token(&hash_token(token))
            .await?
        else {
            return Ok(ResetTokenStatus::Invalid);
        };

        match account.reset_token_expires_at {
            Some(expires_at) if expires_at > now => Ok(ResetTokenStatus::Valid(account)),
            _ => Ok(ResetTokenStatus::Expired),
        }
    }

    /// Redeem a token and set a new password.
    ///
    /// The token is consumed in the same write that stores the new hash; the
    /// write also clears `failed_attempts` and any timed lockout. A disabled
    /// account stays disabled.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> Result<Account, Error> {
        validate_password(new_password)?;

        match self.verify(token, now).await? {
            ResetTokenStatus::Valid(_) => {}
            ResetTokenStatus::Expired => return Err(Error::Auth(AuthError::ResetTokenExpired)),
            ResetTokenStatus::Invalid => return Err(Error::Auth(AuthError::ResetTokenInvalid)),
        }

        let account = self
            .repository
            .consume_reset_token(&hash_token(token), &hash_password(new_password), now)
            .await?
            // Redeemed concurrently between the check and the write
            .ok_or(Error::Auth(AuthError::ResetTokenInvalid))?;

        tracing::info!(account_id = %account.id, "Password reset completed");
        Ok(account)
    }
}
