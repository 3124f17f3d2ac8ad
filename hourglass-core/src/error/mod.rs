pub mod utilities;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::activity::ActivityRejection;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Mailer error: {0}")]
    Mailer(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account locked until {until}")]
    AccountLocked { until: DateTime<Utc> },

    #[error("Account disabled")]
    AccountDisabled,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Account already exists")]
    AccountAlreadyExists,

    #[error("Reset token is invalid")]
    ResetTokenInvalid,

    #[error("Reset token has expired")]
    ResetTokenExpired,

    #[error("Identity provider rejected the login")]
    ProviderRejected,

    #[error("Identity provider unavailable: {0}")]
    ProviderUnavailable(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found")]
    NotFound,

    #[error("Session expired")]
    Expired,

    #[error("Activity report rejected: {0}")]
    ActivityRejected(ActivityRejection),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Record not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Concurrent update detected, retry the transaction")]
    Conflict,
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

impl Error {
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    pub fn is_session_error(&self) -> bool {
        matches!(self, Error::Session(_))
    }

    /// Lost-update conflicts are transient; the operation may be retried.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Storage(StorageError::Conflict))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let auth_error = Error::Auth(AuthError::InvalidCredentials);
        assert_eq!(
            auth_error.to_string(),
            "Authentication error: Invalid credentials"
        );

        let validation_error =
            Error::Validation(ValidationError::InvalidEmail("test@".to_string()));
        assert_eq!(
            validation_error.to_string(),
            "Validation error: Invalid email format: test@"
        );

        let storage_error = Error::Storage(StorageError::NotFound);
        assert_eq!(storage_error.to_string(), "Storage error: Record not found");
    }

    #[test]
    fn test_account_locked_display_includes_deadline() {
        let until = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let err = AuthError::AccountLocked { until };
        assert_eq!(
            err.to_string(),
            "Account locked until 2023-11-14 22:13:20 UTC"
        );
    }

    #[test]
    fn test_activity_rejection_display() {
        let err = SessionError::ActivityRejected(ActivityRejection::ExceedsBound {
            claimed: 90,
            allowed: 35,
        });
        assert_eq!(
            err.to_string(),
            "Activity report rejected: claimed 90 seconds but at most 35 are allowed"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::Auth(AuthError::AccountDisabled).is_auth_error());
        assert!(!Error::Storage(StorageError::NotFound).is_auth_error());
        assert!(Error::Storage(StorageError::Conflict).is_conflict());
        assert!(!Error::Storage(StorageError::NotFound).is_conflict());
        assert!(Error::Session(SessionError::Expired).is_session_error());
        assert!(
            Error::Validation(ValidationError::InvalidPayload("x".to_string()))
                .is_validation_error()
        );
    }

    #[test]
    fn test_error_from_conversions() {
        let error: Error = AuthError::InvalidCredentials.into();
        assert!(matches!(error, Error::Auth(AuthError::InvalidCredentials)));

        let error: Error = StorageError::Conflict.into();
        assert!(matches!(error, Error::Storage(StorageError::Conflict)));
    }
}
