//! Email delivery through async SMTP.

use crate::error::{ConnectError, SendError};
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;

use super::ChannelAdapter;
use async_trait::async_trait;

fn default_smtp_port() -> u16 {
    587
}

fn default_use_tls() -> bool {
    true
}

/// Credential blob shape for [`SmtpAdapter`]
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    /// SMTP relay hostname
    pub smtp_host: String,
    /// SMTP relay port
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// Mailbox address used as both login and From
    pub email: String,
    /// SMTP password or app token
    pub password: String,
    /// Negotiate STARTTLS (disable only for local test relays)
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,
    /// Optional display name for the From header
    #[serde(default)]
    pub sender_name: Option<String>,
}

/// SMTP adapter built on lettre's tokio transport
///
/// The transport holds a connection pool internally; one adapter instance
/// serves every recipient of a campaign run. `subject` is required in spirit
/// here: a campaign without one falls back to its name at dispatch time.
pub struct SmtpAdapter {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl std::fmt::Debug for SmtpAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpAdapter").field("from", &self.from).finish()
    }
}

impl SmtpAdapter {
    /// Build the transport and From mailbox from a parsed credential blob
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Config`] if the From address does not parse
    /// or the relay hostname is unusable.
    pub fn new(config: SmtpConfig) -> Result<Self, ConnectError> {
        let from: Mailbox = match &config.sender_name {
            Some(name) => format!("{name} <{}>", config.email),
            None => config.email.clone(),
        }
        .parse()
        .map_err(|e| ConnectError::Config(format!("invalid from address: {e}")))?;

        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .map_err(|e| ConnectError::Config(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        };

        let mailer = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(config.email, config.password))
            .build();

        Ok(Self { mailer, from })
    }
}

#[async_trait]
impl ChannelAdapter for SmtpAdapter {
    async fn connect(&self) -> Result<(), ConnectError> {
        let alive = self.mailer.test_connection().await.map_err(|e| {
            if e.is_permanent() {
                ConnectError::Auth(e.to_string())
            } else {
                ConnectError::Unreachable(e.to_string())
            }
        })?;
        if !alive {
            return Err(ConnectError::Unreachable("SMTP NOOP failed".to_string()));
        }
        tracing::debug!(adapter = self.name(), "SMTP probe succeeded");
        Ok(())
    }

    async fn send(
        &self,
        recipient: &str,
        text: &str,
        subject: Option<&str>,
    ) -> Result<(), SendError> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|e| SendError::InvalidRecipient(format!("{recipient}: {e}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject.unwrap_or_default())
            .header(ContentType::TEXT_PLAIN)
            .body(text.to_string())
            .map_err(|e| SendError::Rejected(e.to_string()))?;

        self.mailer.send(message).await.map_err(|e| {
            if e.is_permanent() {
                SendError::Rejected(e.to_string())
            } else {
                SendError::Transport(e.to_string())
            }
        })?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sample_config() -> SmtpConfig {
        serde_json::from_value(serde_json::json!({
            "smtp_host": "mail.example.com",
            "email": "news@example.com",
            "password": "hunter2",
        }))
        .unwrap()
    }

    #[test]
    fn config_defaults_apply() {
        let config = sample_config();
        assert_eq!(config.smtp_port, 587);
        assert!(config.use_tls);
        assert!(config.sender_name.is_none());
    }

    #[test]
    fn from_header_includes_sender_name() {
        let mut config = sample_config();
        config.sender_name = Some("Example News".to_string());
        config.use_tls = false;
        let adapter = SmtpAdapter::new(config).unwrap();
        assert_eq!(adapter.from.to_string(), "Example News <news@example.com>");
    }

    #[test]
    fn invalid_from_address_is_a_config_error() {
        let mut config = sample_config();
        config.email = "not an address".to_string();
        let err = SmtpAdapter::new(config).unwrap_err();
        assert!(matches!(err, ConnectError::Config(_)));
    }

    #[tokio::test]
    async fn unparseable_recipient_is_invalid_not_transport() {
        let mut config = sample_config();
        config.use_tls = false;
        let adapter = SmtpAdapter::new(config).unwrap();
        let err = adapter
            .send("definitely not an email", "hi", Some("s"))
            .await
            .unwrap_err();
        assert!(matches!(err, SendError::InvalidRecipient(_)));
    }
}
