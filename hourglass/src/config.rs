//! Aggregate configuration for [`Hourglass`](crate::Hourglass)

use std::time::Duration;

use hourglass_core::{
    ActivityPolicy, LockoutPolicy, ResetConfig, SessionConfig, config::lookup_seconds,
};

/// Every tunable of an [`Hourglass`](crate::Hourglass) instance.
///
/// # Example
///
/// ```rust
/// use hourglass::{HourglassConfig, SessionConfig};
///
/// let config = HourglassConfig::default()
///     .with_session(SessionConfig::default().with_max_age(chrono::Duration::hours(8)));
/// ```
#[derive(Debug, Clone)]
pub struct HourglassConfig {
    pub lockout: LockoutPolicy,
    pub activity: ActivityPolicy,
    pub session: SessionConfig,
    pub reset: ResetConfig,
    /// Upper bound on a single identity provider call. Defaults to 10 seconds.
    pub provider_timeout: Duration,
}

impl Default for HourglassConfig {
    fn default() -> Self {
        Self {
            lockout: LockoutPolicy::default(),
            activity: ActivityPolicy::default(),
            session: SessionConfig::default(),
            reset: ResetConfig::default(),
            provider_timeout: Duration::from_secs(10),
        }
    }
}

impl HourglassConfig {
    pub fn with_lockout(mut self, lockout: LockoutPolicy) -> Self {
        self.lockout = lockout;
        self
    }

    pub fn with_activity(mut self, activity: ActivityPolicy) -> Self {
        self.activity = activity;
        self
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn with_reset(mut self, reset: ResetConfig) -> Self {
        self.reset = reset;
        self
    }

    pub fn with_provider_timeout(mut self, provider_timeout: Duration) -> Self {
        self.provider_timeout = provider_timeout;
        self
    }

    /// Build every section from `HOURGLASS_*` environment variables.
    ///
    /// Besides the variables read by the individual sections this reads
    /// `HOURGLASS_PROVIDER_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            lockout: LockoutPolicy::from_env_with(&lookup),
            activity: ActivityPolicy::from_env_with(&lookup),
            session: SessionConfig::from_env_with(&lookup),
            reset: ResetConfig::from_env_with(&lookup),
            provider_timeout: lookup_seconds(&lookup, "HOURGLASS_PROVIDER_TIMEOUT_SECS")
                .and_then(|d| d.to_std().ok())
                .unwrap_or(defaults.provider_timeout),
        }
    }
}
