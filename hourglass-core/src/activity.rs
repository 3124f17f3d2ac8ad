//! Active-time reconciliation
//!
//! Clients report how many seconds of in-page activity they saw since their
//! last report. The server never trusts that number on its own: a report is
//! accepted only if it fits inside the wall-clock time since the session's
//! baseline, and never more than one reporting interval plus a small slack.
//! A client can therefore inflate its active time by at most
//! `report_interval + slack` per report, and replaying a report immediately
//! finds an elapsed time of zero.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    config::{lookup_seconds, process_env},
    session::Session,
};

/// Why a report was discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ActivityRejection {
    #[error("reported a negative number of seconds ({claimed})")]
    Negative { claimed: i64 },

    #[error("claimed {claimed} seconds but at most {allowed} are allowed")]
    ExceedsBound { claimed: i64, allowed: i64 },

    #[error("session is closed")]
    SessionClosed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityPolicy {
    /// Cadence at which clients are expected to report
    pub report_interval: Duration,
    /// Extra tolerance for network jitter
    pub slack: Duration,
}

impl Default for ActivityPolicy {
    fn default() -> Self {
        Self {
            report_interval: Duration::seconds(30),
            slack: Duration::seconds(5),
        }
    }
}

impl ActivityPolicy {
    pub fn new(report_interval: Duration, slack: Duration) -> Self {
        Self {
            report_interval,
            slack,
        }
    }

    /// Reads `HOURGLASS_ACTIVITY_REPORT_INTERVAL_SECS` and
    /// `HOURGLASS_ACTIVITY_SLACK_SECS`.
    pub fn from_env() -> Self {
        Self::from_env_with(process_env)
    }

    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            report_interval: lookup_seconds(&lookup, "HOURGLASS_ACTIVITY_REPORT_INTERVAL_SECS")
                .unwrap_or(defaults.report_interval),
            slack: lookup_seconds(&lookup, "HOURGLASS_ACTIVITY_SLACK_SECS")
                .unwrap_or(defaults.slack),
        }
    }

    /// Upper bound for a single report, in seconds.
    pub fn cap_seconds(&self) -> i64 {
        (self.report_interval + self.slack).num_seconds()
    }

    /// The most a report arriving at `now` may claim for `session`.
    pub fn allowed_seconds(&self, session: &Session, now: DateTime<Utc>) -> i64 {
        let elapsed = (now - session.baseline()).num_seconds().max(0);
        elapsed.min(self.cap_seconds())
    }

    /// Validate a report and, if it is within bounds, apply it to `session`.
    ///
    /// On acceptance `active_time_seconds` grows by `claimed` and the baseline
    /// moves to `now`. On rejection the session is left untouched.
    pub fn reconcile(
        &self,
        session: &mut Session,
        claimed: i64,
        now: DateTime<Utc>,
    ) -> Result<i64, ActivityRejection> {
        if !session.is_open() {
            return Err(ActivityRejection::SessionClosed);
        }

        if claimed < 0 {
            return Err(ActivityRejection::Negative { claimed });
        }

        let allowed = self.allowed_seconds(session, now);
        if claimed > allowed {
            return Err(ActivityRejection::ExceedsBound { claimed, allowed });
        }

        session.active_time_seconds += claimed;
        session.last_update_time = Some(now);
        Ok(claimed)
    }
}
