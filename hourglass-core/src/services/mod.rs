//! Service layer for business logic
//!
//! Services own the read-decide-write cycles. They are generic over the
//! repository traits and hold their repositories behind `Arc`, so one
//! service instance can be shared across request handlers.

pub mod account;
pub mod identity;
pub mod leaderboard;
pub mod lockout;
pub mod mailer;
pub mod password_reset;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use account::AccountService;
pub use identity::IdentityService;
pub use leaderboard::LeaderboardService;
pub use lockout::LockoutService;
pub use mailer::{MailerService, TracingMailer};
pub use password_reset::{PasswordResetService, ResetTokenStatus};
pub use session::{ActivityReceipt, SessionService};

/// How many times a compare-and-swap write is re-decided after losing a race
/// before the conflict is returned to the caller.
pub const MAX_CONFLICT_RETRIES: u32 = 3;
