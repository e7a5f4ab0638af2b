use async_trait::async_trait;
use tracing::info;

use super::{MailError, Mailer};

/// Development mailer: writes messages to the log instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        info!(to = %to, subject = %subject, body = %html, "📧 Email (development mode, not sent)");
        Ok(())
    }
}
