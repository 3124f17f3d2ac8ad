use hourglass::{Account, Login, Session};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /activity`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityReport {
    pub active_seconds: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResetTokenQuery {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederatedCallbackQuery {
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub account: Account,
    pub session: Session,
    /// Bearer token for clients that do not keep cookies
    pub token: String,
}

impl From<Login> for LoginResponse {
    fn from(login: Login) -> Self {
        Self {
            account: login.account,
            session: login.session,
            token: login.token.into_inner(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountResponse {
    pub account: Account,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub session: Session,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityResponse {
    pub status: &'static str,
    pub total_active_seconds: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyResetTokenResponse {
    pub valid: bool,
    /// `valid`, `expired` or `invalid`
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl From<ConnectionInfo> for hourglass::ClientContext {
    fn from(info: ConnectionInfo) -> Self {
        hourglass::ClientContext::new(info.user_agent, info.ip)
    }
}

#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub name: String,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: CookieSameSite,
    pub path: String,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self::new("session_id")
    }
}

#[derive(Debug, Clone, Default)]
pub enum CookieSameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl CookieConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            http_only: true,
            secure: true,
            same_site: CookieSameSite::Lax,
            path: "/".to_string(),
        }
    }

    /// Same as the default but without `Secure`, for plain-HTTP local setups
    pub fn development() -> Self {
        Self {
            secure: false,
            ..Self::default()
        }
    }
}
