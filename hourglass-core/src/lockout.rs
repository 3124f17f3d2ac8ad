//! Progressive lockout
//!
//! Every run of `threshold` consecutive failed password checks escalates the
//! account one level. Each level below the length of the duration table locks
//! the account for the matching duration; escalating past the end of the table
//! disables the account for good.
//!
//! With the default policy:
//!
//! | Level before | After 3 failures            |
//! | ------------ | --------------------------- |
//! | 0            | locked 1 minute, level 1    |
//! | 1            | locked 1 hour, level 2      |
//! | 2            | locked 24 hours, level 3    |
//! | 3            | disabled                    |
//!
//! The transition functions here are pure: they mutate an in-memory
//! [`Account`] and leave persistence to
//! [`LockoutService`](crate::services::LockoutService).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    account::Account,
    config::{lookup_u32, process_env},
    crypto::verify_password,
};

/// Result of a single credential attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    InvalidCredential,
    AccountLocked { until: DateTime<Utc> },
    AccountDisabled,
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Consecutive failures that trigger an escalation
    pub threshold: u32,
    /// Lockout duration for each level, in order
    pub durations: Vec<Duration>,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            threshold: 3,
            durations: vec![Duration::minutes(1), Duration::hours(1), Duration::hours(24)],
        }
    }
}

impl LockoutPolicy {
    pub fn new(threshold: u32, durations: Vec<Duration>) -> Self {
        Self {
            threshold: threshold.max(1),
            durations,
        }
    }

    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold.max(1);
        self
    }

    pub fn with_durations(mut self, durations: Vec<Duration>) -> Self {
        self.durations = durations;
        self
    }

    /// Reads `HOURGLASS_LOCKOUT_THRESHOLD` and `HOURGLASS_LOCKOUT_DURATIONS_SECS`
    /// (comma separated, e.g. `60,3600,86400`).
    pub fn from_env() -> Self {
        Self::from_env_with(process_env)
    }

    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let durations = lookup("HOURGLASS_LOCKOUT_DURATIONS_SECS")
            .and_then(|raw| {
                raw.split(',')
                    .map(|part| part.trim().parse::<i64>().ok().filter(|s| *s > 0))
                    .collect::<Option<Vec<_>>>()
            })
            .filter(|secs| !secs.is_empty())
            .map(|secs| secs.into_iter().map(Duration::seconds).collect())
            .unwrap_or(defaults.durations);

        Self::new(
            lookup_u32(&lookup, "HOURGLASS_LOCKOUT_THRESHOLD").unwrap_or(defaults.threshold),
            durations,
        )
    }

    /// Highest level an account can reach before being disabled.
    pub fn max_level(&self) -> u32 {
        self.durations.len() as u32
    }

    /// Decide a password attempt and apply the resulting state to `account`.
    ///
    /// Returns `AccountDisabled` or `AccountLocked` without touching the
    /// account when it is already in that state. An account without a local
    /// password never matches.
    pub fn attempt(
        &self,
        account: &mut Account,
        password: &str,
        now: DateTime<Utc>,
    ) -> AttemptOutcome {
        if let Some(outcome) = self.gate(account, now) {
            return outcome;
        }

        let matches = account
            .password_hash
            .as_deref()
            .is_some_and(|hash| verify_password(password, hash));

        if matches {
            self.record_success(account);
            AttemptOutcome::Success
        } else {
            self.record_failure(account, now)
        }
    }

    /// Admission check for a login that was verified elsewhere (federated).
    ///
    /// Applies the same gate as [`attempt`](Self::attempt) and, if it passes,
    /// the success transition.
    pub fn admit(&self, account: &mut Account, now: DateTime<Utc>) -> AttemptOutcome {
        if let Some(outcome) = self.gate(account, now) {
            return outcome;
        }
        self.record_success(account);
        AttemptOutcome::Success
    }

    fn gate(&self, account: &Account, now: DateTime<Utc>) -> Option<AttemptOutcome> {
        if account.disabled {
            return Some(AttemptOutcome::AccountDisabled);
        }
        account
            .locked_until(now)
            .map(|until| AttemptOutcome::AccountLocked { until })
    }

    fn record_success(&self, account: &mut Account) {
        account.failed_attempts = 0;
        account.lockout_until = None;
    }

    fn record_failure(&self, account: &mut Account, now: DateTime<Utc>) -> AttemptOutcome {
        account.failed_attempts += 1;

        if account.failed_attempts < self.threshold {
            return AttemptOutcome::InvalidCredential;
        }

        account.failed_attempts = 0;

        match self.durations.get(account.lockout_level as usize) {
            Some(duration) => {
                let until = now + *duration;
                account.lockout_until = Some(until);
                account.lockout_level += 1;
                AttemptOutcome::AccountLocked { until }
            }
            None => {
                account.disabled = true;
                account.lockout_until = None;
                AttemptOutcome::AccountDisabled
            }
        }
    }
}
