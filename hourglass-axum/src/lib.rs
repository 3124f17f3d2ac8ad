//! # Hourglass Axum Integration
//!
//! JSON routes and middleware that put an [`Hourglass`] instance behind HTTP.
//!
//! ## Routes
//!
//! | Method | Path | |
//! | --- | --- | --- |
//! | `POST` | `/register` | create an account and sign it in |
//! | `POST` | `/login` | password login |
//! | `GET` | `/login/federated/callback?code=` | federated login |
//! | `POST`, `GET` | `/logout` | close the current session |
//! | `GET` | `/session` | the current session |
//! | `POST` | `/activity` | report active seconds |
//! | `GET` | `/leaderboard?page=&per_page=` | ranking by active time |
//! | `POST` | `/password/reset` | mail a reset link |
//! | `GET` | `/password/reset/verify?token=` | check a reset token |
//! | `POST` | `/password/reset/confirm` | set a new password |
//! | `GET` | `/health` | storage health |
//!
//! The session token is read from an `Authorization: Bearer` header or the
//! session cookie. Errors are returned as
//! `{"status": "error", "error": <code>, "message": <text>}`.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use axum::Router;
//! use hourglass::{Hourglass, SqliteRepositoryProvider};
//! use hourglass_axum::{routes, CookieConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let pool = sqlx::SqlitePool::connect("sqlite://hourglass.db?mode=rwc").await.unwrap();
//!     let hourglass = Arc::new(Hourglass::new(Arc::new(SqliteRepositoryProvider::new(pool))));
//!     hourglass.migrate().await.unwrap();
//!
//!     let app = Router::new().nest(
//!         "/auth",
//!         routes(hourglass)
//!             .with_cookie_config(CookieConfig::development())
//!             .build(),
//!     );
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

mod error;
mod extractors;
mod middleware;
mod routes;
mod types;

pub use error::{ApiError, Result};
pub use extractors::{CurrentSession, Payload, SessionTokenFromRequest};
pub use middleware::{AuthState, require_auth};
pub use routes::create_router;
pub use types::{
    AccountResponse, ActivityReport, ActivityResponse, ConnectionInfo, CookieConfig,
    CookieSameSite, FederatedCallbackQuery, HealthResponse, LeaderboardQuery, LoginRequest,
    LoginResponse, MessageResponse, PasswordResetRequest, RegisterRequest, ResetPasswordRequest,
    SessionResponse, VerifyResetTokenQuery, VerifyResetTokenResponse,
};

use axum::Router;
use hourglass::Hourglass;
use hourglass_core::repositories::RepositoryProvider;
use std::sync::Arc;

/// Create the Hourglass routes for your Axum application.
///
/// The returned builder can be nested at any path (e.g., "/auth").
pub fn routes<R>(hourglass: Arc<Hourglass<R>>) -> HourglassRouterBuilder<R>
where
    R: RepositoryProvider + 'static,
{
    HourglassRouterBuilder {
        hourglass,
        cookie_config: CookieConfig::default(),
    }
}

/// Builder for configuring the routes
pub struct HourglassRouterBuilder<R: RepositoryProvider> {
    hourglass: Arc<Hourglass<R>>,
    cookie_config: CookieConfig,
}

impl<R: RepositoryProvider + 'static> HourglassRouterBuilder<R> {
    pub fn with_cookie_config(mut self, config: CookieConfig) -> Self {
        self.cookie_config = config;
        self
    }

    pub fn build(self) -> Router {
        create_router(self.hourglass, self.cookie_config)
    }
}

impl<R: RepositoryProvider + 'static> From<HourglassRouterBuilder<R>> for Router {
    fn from(builder: HourglassRouterBuilder<R>) -> Self {
        builder.build()
    }
}
