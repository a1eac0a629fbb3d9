// Outbound notifications
// Verification messages are composed here and handed to a Notifier

pub mod console;
pub mod mail;

use async_trait::async_trait;
use thiserror::Error;

pub use console::ConsoleNotifier;
pub use mail::{MailSecurity, MailSettings, SmtpNotifier};

pub const VERIFICATION_SUBJECT: &str = "Verify your email address";

/// A plain-text email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("mail transport failed: {0}")]
    Transport(String),

    #[error("message could not be built: {0}")]
    Rejected(String),

    #[error("mail settings invalid: {0}")]
    Settings(String),
}

impl From<lettre::transport::smtp::Error> for NotifyError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        NotifyError::Transport(err.to_string())
    }
}

/// Delivery channel for account notifications
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn send(&self, message: EmailMessage) -> Result<(), NotifyError>;
}

/// Link a user follows to verify their email
pub fn verification_link(base_url: &str, token: &str) -> String {
    format!(
        "{}/auth/verify-email?token={}",
        base_url.trim_end_matches('/'),
        token
    )
}

/// Compose the verification email for a freshly registered account
pub fn verification_message(to: &str, base_url: &str, token: &str) -> EmailMessage {
    let link = verification_link(base_url, token);
    EmailMessage {
        to: to.to_string(),
        subject: VERIFICATION_SUBJECT.to_string(),
        body: format!(
            "Welcome!\n\n\
             Please verify your email address by opening the link below:\n\n\
             {}\n\n\
             If you did not create an account, you can ignore this message.\n",
            link
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_link_trims_trailing_slash() {
        assert_eq!(
            verification_link("http://localhost:8080/", "abc"),
            "http://localhost:8080/auth/verify-email?token=abc"
        );
    }

    #[test]
    fn test_verification_message() {
        let message = verification_message("a@x.com", "https://id.example.com", "deadbeef");

        assert_eq!(message.to, "a@x.com");
        assert_eq!(message.subject, "Verify your email address");
        assert!(message
            .body
            .contains("https://id.example.com/auth/verify-email?token=deadbeef"));
    }
}
