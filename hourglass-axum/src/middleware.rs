use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use hourglass::{Error, Hourglass, RepositoryProvider};

use crate::{error::ApiError, extractors::SessionTokenFromRequest};

pub struct AuthState<R: RepositoryProvider> {
    pub hourglass: Arc<Hourglass<R>>,
}

impl<R: RepositoryProvider> Clone for AuthState<R> {
    fn clone(&self) -> Self {
        Self {
            hourglass: self.hourglass.clone(),
        }
    }
}

/// Reject requests without an open session; otherwise make the session
/// available to [`CurrentSession`](crate::CurrentSession).
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/me", get(me_handler))
///     .route_layer(axum::middleware::from_fn_with_state(
///         AuthState { hourglass },
///         require_auth::<SqliteRepositoryProvider>,
///     ));
/// ```
pub async fn require_auth<R>(
    State(state): State<AuthState<R>>,
    SessionTokenFromRequest(session_token): SessionTokenFromRequest,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError>
where
    R: RepositoryProvider,
{
    let session_token = session_token.ok_or(ApiError::NotAuthenticated)?;

    let session = state
        .hourglass
        .authenticate_session(&session_token)
        .await
        .map_err(|e| match e.core() {
            Some(Error::Auth(_) | Error::Session(_)) => {
                tracing::debug!(error = %e, "Rejected session token");
                ApiError::NotAuthenticated
            }
            _ => ApiError::from(e),
        })?;

    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}
