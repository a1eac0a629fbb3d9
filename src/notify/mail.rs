// SMTP notifier
// Delivers plain-text mail through an SMTP server, STARTTLS by default and implicit TLS on 465

use async_trait::async_trait;
use lettre::{
    address::AddressError,
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::notify::{EmailMessage, NotifyError, Notifier};

const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

/// How the SMTP connection is secured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailSecurity {
    /// Plain connection upgraded with STARTTLS
    Starttls,
    /// TLS from the first byte
    Tls,
    /// Unencrypted, for local test servers only
    None,
}

impl MailSecurity {
    pub fn for_port(port: u16) -> Self {
        if port == 465 {
            MailSecurity::Tls
        } else {
            MailSecurity::Starttls
        }
    }
}

impl FromStr for MailSecurity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "starttls" => Ok(MailSecurity::Starttls),
            "tls" => Ok(MailSecurity::Tls),
            "none" => Ok(MailSecurity::None),
            other => Err(format!("unknown mail security '{}'", other)),
        }
    }
}

/// Connection settings for [`SmtpNotifier`]
#[derive(Clone)]
pub struct MailSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub from_name: Option<String>,
    pub security: MailSecurity,
}

impl std::fmt::Debug for MailSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("from", &self.from)
            .field("from_name", &self.from_name)
            .field("security", &self.security)
            .finish_non_exhaustive()
    }
}

impl MailSettings {
    /// `Name <address>` when a name is set
    pub fn sender(&self) -> Result<Mailbox, NotifyError> {
        let address = self
            .from
            .parse()
            .map_err(|e: AddressError| NotifyError::Settings(format!("invalid sender address: {}", e)))?;
        let name = self.from_name.clone().filter(|n| !n.is_empty());
        Ok(Mailbox::new(name, address))
    }
}

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    host: String,
}

impl SmtpNotifier {
    pub fn new(settings: MailSettings) -> Result<Self, NotifyError> {
        if settings.host.is_empty() {
            return Err(NotifyError::Settings("mail host is required".to_string()));
        }
        let sender = settings.sender()?;

        let builder = match settings.security {
            MailSecurity::Starttls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
            }
            MailSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)?,
            MailSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(settings.host.as_str())
            }
        };

        let mut builder = builder.port(settings.port).timeout(Some(SMTP_TIMEOUT));
        if let Some(username) = settings.username {
            builder = builder.credentials(Credentials::new(
                username,
                settings.password.unwrap_or_default(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            sender,
            host: settings.host,
        })
    }

    fn compose(&self, message: EmailMessage) -> Result<Message, NotifyError> {
        let to: Mailbox = message.to.parse().map_err(|e: AddressError| {
            NotifyError::Rejected(format!("invalid recipient '{}': {}", message.to, e))
        })?;

        Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject(message.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(message.body)
            .map_err(|e| NotifyError::Rejected(e.to_string()))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, message: EmailMessage) -> Result<(), NotifyError> {
        let to = message.to.clone();
        let subject = message.subject.clone();
        let email = self.compose(message)?;

        debug!("Sending mail to {} via {}", to, self.host);
        self.transport.send(email).await?;

        info!("Mail '{}' accepted by {} for {}", subject, self.host, to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(host: &str, port: u16, security: MailSecurity) -> MailSettings {
        MailSettings {
            host: host.to_string(),
            port,
            username: None,
            password: None,
            from: "noreply@x.com".to_string(),
            from_name: None,
            security,
        }
    }

    #[test]
    fn test_security_defaults_and_parsing() {
        assert_eq!(MailSecurity::for_port(587), MailSecurity::Starttls);
        assert_eq!(MailSecurity::for_port(465), MailSecurity::Tls);
        assert_eq!("NONE".parse::<MailSecurity>(), Ok(MailSecurity::None));
        assert!("ssl3".parse::<MailSecurity>().is_err());
    }

    #[test]
    fn test_sender() {
        let mut s = settings("smtp.x.com", 587, MailSecurity::Starttls);
        assert_eq!(s.sender().unwrap().to_string(), "noreply@x.com");
        s.from_name = Some("Identity".to_string());
        assert_eq!(s.sender().unwrap().to_string(), "Identity <noreply@x.com>");
    }

    #[test]
    fn test_debug_hides_password() {
        let mut s = settings("smtp.x.com", 587, MailSecurity::Starttls);
        s.password = Some("hunter22".to_string());
        assert!(!format!("{:?}", s).contains("hunter22"));
    }

    #[test]
    fn test_new_requires_host_and_valid_sender() {
        assert!(SmtpNotifier::new(settings("", 587, MailSecurity::Starttls)).is_err());
        let mut s = settings("smtp.x.com", 587, MailSecurity::Starttls);
        s.from = "not an address".to_string();
        assert!(matches!(SmtpNotifier::new(s), Err(NotifyError::Settings(_))));
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_rejected_before_connecting() {
        let notifier = SmtpNotifier::new(settings("127.0.0.1", 1, MailSecurity::None)).unwrap();
        let result = notifier
            .send(EmailMessage {
                to: "nobody".to_string(),
                subject: "s".to_string(),
                body: "b".to_string(),
            })
            .await;
        assert!(matches!(result, Err(NotifyError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_transport_error() {
        let notifier = SmtpNotifier::new(settings("127.0.0.1", 1, MailSecurity::None)).unwrap();
        let result = notifier
            .send(EmailMessage {
                to: "a@x.com".to_string(),
                subject: "s".to_string(),
                body: "b".to_string(),
            })
            .await;
        assert!(matches!(result, Err(NotifyError::Transport(_))));
    }
}
