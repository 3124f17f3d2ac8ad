//! Configuration for sessions and password reset
//!
//! Every config struct has a `Default` matching production behavior, builder
//! style setters, and a `from_env()` constructor reading `HOURGLASS_*`
//! variables. Unset or unparsable variables fall back to the default.
//! `from_env_with` takes the variable lookup as a closure so the parsing can be
//! exercised without touching the process environment.

use chrono::Duration;

/// Read an integer number of seconds from `key`.
pub fn lookup_seconds<F>(lookup: &F, key: &str) -> Option<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|secs| *secs >= 0)
        .map(Duration::seconds)
}

/// Read a non-negative integer from `key`.
pub fn lookup_u32<F>(lookup: &F, key: &str) -> Option<u32>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}

pub(crate) fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Session lifetime settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Sessions older than this (measured from login) are closed on their
    /// next use. Defaults to 2 hours.
    pub max_age: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_age: Duration::hours(2),
        }
    }
}

impl SessionConfig {
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Reads `HOURGLASS_SESSION_MAX_AGE_SECS`.
    pub fn from_env() -> Self {
        Self::from_env_with(process_env)
    }

    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            max_age: lookup_seconds(&lookup, "HOURGLASS_SESSION_MAX_AGE_SECS")
                .unwrap_or(defaults.max_age),
        }
    }
}

/// Password reset settings
#[derive(Debug, Clone)]
pub struct ResetConfig {
    /// How long an issued token stays valid. Defaults to 1 hour.
    pub token_lifetime: Duration,

    /// Base URL of the page that accepts the token; the mailed link is
    /// `{reset_url_base}?token={token}`.
    pub reset_url_base: String,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            token_lifetime: Duration::hours(1),
            reset_url_base: "http://localhost:3000/password/reset".to_string(),
        }
    }
}

impl ResetConfig {
    pub fn with_token_lifetime(mut self, token_lifetime: Duration) -> Self {
        self.token_lifetime = token_lifetime;
        self
    }

    pub fn with_reset_url_base(mut self, reset_url_base: impl Into<String>) -> Self {
        self.reset_url_base = reset_url_base.into();
        self
    }

    /// The link mailed to the account owner.
    pub fn reset_link(&self, token: &str) -> String {
        format!("{}?token={token}", self.reset_url_base)
    }

    /// Reads `HOURGLASS_RESET_TOKEN_LIFETIME_SECS` and `HOURGLASS_RESET_URL_BASE`.
    pub fn from_env() -> Self {
        Self::from_env_with(process_env)
    }

    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            token_lifetime: lookup_seconds(&lookup, "HOURGLASS_RESET_TOKEN_LIFETIME_SECS")
                .unwrap_or(defaults.token_lifetime),
            reset_url_base: lookup("HOURGLASS_RESET_URL_BASE").unwrap_or(defaults.reset_url_base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        assert_eq!(SessionConfig::default().max_age, Duration::hours(2));
        assert_eq!(ResetConfig::default().token_lifetime, Duration::hours(1));
    }

    #[test]
    fn test_session_config_from_env() {
        let config = SessionConfig::from_env_with(vars(&[(
            "HOURGLASS_SESSION_MAX_AGE_SECS",
            "600",
        )]));
        assert_eq!(config.max_age, Duration::minutes(10));
    }

    #[test]
    fn test_unparsable_values_fall_back_to_defaults() {
        let config = SessionConfig::from_env_with(vars(&[(
            "HOURGLASS_SESSION_MAX_AGE_SECS",
            "two hours",
        )]));
        assert_eq!(config.max_age, Duration::hours(2));

        let config = ResetConfig::from_env_with(vars(&[(
            "HOURGLASS_RESET_TOKEN_LIFETIME_SECS",
            "-5",
        )]));
        assert_eq!(config.token_lifetime, Duration::hours(1));
    }

    #[test]
    fn test_reset_link() {
        let config = ResetConfig::from_env_with(vars(&[(
            "HOURGLASS_RESET_URL_BASE",
            "https://app.example.com/reset",
        )]));
        assert_eq!(
            config.reset_link("abc"),
            "https://app.example.com/reset?token=abc"
        );
    }
}
