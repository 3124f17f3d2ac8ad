use async_trait::async_trait;

use crate::Error;

/// Outbound mail
///
/// Delivery is fire-and-forget from the caller's point of view: callers log a
/// failed send and carry on.
#[async_trait]
pub trait MailerService: Send + Sync + 'static {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), Error>;
}

/// Development mailer that writes every message to the log instead of sending
#[derive(Debug, Default, Clone)]
pub struct TracingMailer;

#[async_trait]
impl MailerService for TracingMailer {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), Error> {
        tracing::info!(recipient, subject, body, "Outgoing email");
        Ok(())
    }
}
