//! Outbound email.

mod console;
mod smtp;

use async_trait::async_trait;
use thiserror::Error;

pub use self::console::LogMailer;
pub use self::smtp::SmtpMailer;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError>;
}

pub fn verification_email(code: &str, ttl_minutes: i64) -> String {
    format!(
        r#"<div style="font-family:system-ui,Segoe UI,Arial">
  <h2>Your Ticketa code</h2>
  <p>Use the code below to confirm your email. It expires in {ttl_minutes} minutes.</p>
  <div style="font-size:32px;letter-spacing:6px;font-weight:700">{code}</div>
  <p>If this wasn't you, ignore this email.</p>
</div>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_email_contains_code_and_ttl() {
        let html = verification_email("123456", 15);
        assert!(html.contains("123456"));
        assert!(html.contains("15 minutes"));
    }
}
