use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hourglass::{AuthError, Error, HourglassError, SessionError, StorageError, ValidationError};
use serde_json::json;
use thiserror::Error;

/// Everything a handler can fail with.
///
/// Every error renders as `{"status": "error", "error": <code>, "message": <text>}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Hourglass(#[from] HourglassError),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Not authenticated")]
    NotAuthenticated,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Hourglass(HourglassError::Core(err))
    }
}

impl ApiError {
    /// HTTP status and machine-readable code
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        let err = match self {
            ApiError::InvalidPayload(_) => return (StatusCode::BAD_REQUEST, "invalid_payload"),
            ApiError::NotAuthenticated => {
                return (StatusCode::UNAUTHORIZED, "not_authenticated");
            }
            ApiError::Hourglass(HourglassError::FederationNotConfigured) => {
                return (StatusCode::NOT_IMPLEMENTED, "federation_not_configured");
            }
            ApiError::Hourglass(HourglassError::Core(err)) => err,
        };

        match err {
            Error::Auth(auth) => match auth {
                AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
                AuthError::AccountLocked { .. } => (StatusCode::LOCKED, "account_locked"),
                AuthError::AccountDisabled => (StatusCode::FORBIDDEN, "account_disabled"),
                AuthError::NotAuthenticated => (StatusCode::UNAUTHORIZED, "not_authenticated"),
                AuthError::AccountAlreadyExists => (StatusCode::CONFLICT, "account_exists"),
                AuthError::ResetTokenInvalid => (StatusCode::BAD_REQUEST, "reset_token_invalid"),
                AuthError::ResetTokenExpired => (StatusCode::BAD_REQUEST, "reset_token_expired"),
                AuthError::ProviderRejected => (StatusCode::UNAUTHORIZED, "provider_rejected"),
                AuthError::ProviderUnavailable(_) => {
                    (StatusCode::BAD_GATEWAY, "provider_unavailable")
                }
            },
            Error::Session(session) => match session {
                SessionError::NotFound => (StatusCode::NOT_FOUND, "session_not_found"),
                SessionError::Expired => (StatusCode::UNAUTHORIZED, "not_authenticated"),
                SessionError::ActivityRejected(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "activity_out_of_bounds")
                }
            },
            Error::Validation(ValidationError::InvalidPayload(_)) => {
                (StatusCode::BAD_REQUEST, "invalid_payload")
            }
            Error::Validation(_) => (StatusCode::BAD_REQUEST, "validation_failed"),
            Error::Storage(StorageError::Conflict) => {
                (StatusCode::SERVICE_UNAVAILABLE, "storage_conflict")
            }
            Error::Storage(_) | Error::Mailer(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED {
            tracing::error!(error = %self, code, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "status": "error",
            "error": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
