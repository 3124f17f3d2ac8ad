use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use hourglass::{
    ClientContext, Error, Hourglass, HourglassError, RepositoryProvider, ResetTokenStatus,
    SessionError,
};

use crate::{
    error::{ApiError, Result},
    extractors::{CurrentSession, Payload, SessionTokenFromRequest},
    middleware::{AuthState, require_auth},
    types::*,
};

pub fn create_router<R>(hourglass: Arc<Hourglass<R>>, cookie_config: CookieConfig) -> Router
where
    R: RepositoryProvider + 'static,
{
    let state = AuthState { hourglass };

    let protected_routes = Router::new()
        .route("/session", get(get_session_handler))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth::<R>,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/logout", post(logout_handler).get(logout_handler))
        .route("/activity", post(activity_handler))
        .route("/leaderboard", get(leaderboard_handler))
        .route("/password/reset", post(request_password_reset_handler))
        .route("/password/reset/verify", get(verify_reset_token_handler))
        .route("/password/reset/confirm", post(reset_password_handler))
        .route("/login/federated/callback", get(federated_callback_handler))
        .merge(protected_routes)
        .with_state(state)
        .layer(Extension(cookie_config))
}

fn session_cookie(config: &CookieConfig, token: &str) -> Cookie<'static> {
    let same_site = match config.same_site {
        CookieSameSite::Strict => SameSite::Strict,
        CookieSameSite::Lax => SameSite::Lax,
        CookieSameSite::None => SameSite::None,
    };

    Cookie::build((config.name.clone(), token.to_string()))
        .path(config.path.clone())
        .http_only(config.http_only)
        .secure(config.secure)
        .same_site(same_site)
        .build()
}

fn query_error(rejection: QueryRejection) -> ApiError {
    ApiError::InvalidPayload(rejection.body_text())
}

async fn health_handler<R>(State(state): State<AuthState<R>>) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state.hourglass.health_check().await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

async fn register_handler<R>(
    State(state): State<AuthState<R>>,
    Extension(cookie_config): Extension<CookieConfig>,
    connection_info: ConnectionInfo,
    Payload(payload): Payload<RegisterRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state
        .hourglass
        .register(&payload.email, &payload.password, payload.name)
        .await?;

    // Registration signs the new account in
    let login = state
        .hourglass
        .login_with_password(
            &payload.email,
            &payload.password,
            None,
            ClientContext::from(connection_info),
        )
        .await?;

    let cookie = session_cookie(&cookie_config, login.token.as_str());

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie.to_string())],
        Json(LoginResponse::from(login)),
    ))
}

async fn login_handler<R>(
    State(state): State<AuthState<R>>,
    Extension(cookie_config): Extension<CookieConfig>,
    connection_info: ConnectionInfo,
    SessionTokenFromRequest(presented): SessionTokenFromRequest,
    Payload(payload): Payload<LoginRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let login = state
        .hourglass
        .login_with_password(
            &payload.email,
            &payload.password,
            presented.as_ref(),
            ClientContext::from(connection_info),
        )
        .await?;

    let cookie = session_cookie(&cookie_config, login.token.as_str());

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie.to_string())],
        Json(LoginResponse::from(login)),
    ))
}

async fn federated_callback_handler<R>(
    State(state): State<AuthState<R>>,
    Extension(cookie_config): Extension<CookieConfig>,
    connection_info: ConnectionInfo,
    SessionTokenFromRequest(presented): SessionTokenFromRequest,
    query: std::result::Result<Query<FederatedCallbackQuery>, QueryRejection>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let Query(query) = query.map_err(query_error)?;

    let login = state
        .hourglass
        .login_federated(
            &query.code,
            presented.as_ref(),
            ClientContext::from(connection_info),
        )
        .await?;

    let cookie = session_cookie(&cookie_config, login.token.as_str());

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie.to_string())],
        Json(LoginResponse::from(login)),
    ))
}

async fn logout_handler<R>(
    State(state): State<AuthState<R>>,
    Extension(cookie_config): Extension<CookieConfig>,
    jar: CookieJar,
    SessionTokenFromRequest(session_token): SessionTokenFromRequest,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    if let Some(session_token) = session_token {
        match state.hourglass.logout(&session_token).await {
            Ok(()) => {}
            Err(HourglassError::Core(Error::Session(SessionError::NotFound))) => {
                tracing::debug!("Logout with unknown session token");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let jar = jar.remove(Cookie::build((cookie_config.name, "")).path(cookie_config.path));

    Ok((StatusCode::NO_CONTENT, jar))
}

async fn get_session_handler(CurrentSession(session): CurrentSession) -> impl IntoResponse {
    Json(SessionResponse { session })
}

/// `POST /activity`
///
/// A missing token is reported before a malformed body; everything after
/// that is decided by the session ledger.
async fn activity_handler<R>(
    State(state): State<AuthState<R>>,
    SessionTokenFromRequest(session_token): SessionTokenFromRequest,
    payload: std::result::Result<Payload<ActivityReport>, ApiError>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let session_token = session_token.ok_or(ApiError::NotAuthenticated)?;
    let Payload(report) = payload?;

    let receipt = state
        .hourglass
        .record_activity(&session_token, report.active_seconds)
        .await?;

    Ok(Json(ActivityResponse {
        status: "ok",
        total_active_seconds: receipt.total_active_seconds,
    }))
}

async fn leaderboard_handler<R>(
    State(state): State<AuthState<R>>,
    query: std::result::Result<Query<LeaderboardQuery>, QueryRejection>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let Query(query) = query.map_err(query_error)?;

    let page = state
        .hourglass
        .leaderboard(query.page, query.per_page)
        .await?;

    Ok(Json(page))
}

async fn request_password_reset_handler<R>(
    State(state): State<AuthState<R>>,
    Payload(payload): Payload<PasswordResetRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state
        .hourglass
        .request_password_reset(&payload.email)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "If an account with that email exists, a password reset link has been sent."
                .to_string(),
        }),
    ))
}

async fn verify_reset_token_handler<R>(
    State(state): State<AuthState<R>>,
    query: std::result::Result<Query<VerifyResetTokenQuery>, QueryRejection>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let Query(query) = query.map_err(query_error)?;

    let status = match state.hourglass.verify_reset_token(&query.token).await? {
        ResetTokenStatus::Valid(_) => "valid",
        ResetTokenStatus::Expired => "expired",
        ResetTokenStatus::Invalid => "invalid",
    };

    Ok(Json(VerifyResetTokenResponse {
        valid: status == "valid",
        status,
    }))
}

async fn reset_password_handler<R>(
    State(state): State<AuthState<R>>,
    Payload(payload): Payload<ResetPasswordRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let account = state
        .hourglass
        .reset_password(&payload.token, &payload.new_password)
        .await?;

    Ok(Json(AccountResponse { account }))
}
