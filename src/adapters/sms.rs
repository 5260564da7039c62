//! SMS delivery through an HTTP gateway.

use crate::error::{ConnectError, SendError};
use serde::Deserialize;
use std::time::Duration;

use super::ChannelAdapter;
use async_trait::async_trait;

const DEFAULT_API_URL: &str = "https://api.sms.ru/sms/send";

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

/// Credential blob shape for [`HttpSmsAdapter`]
#[derive(Debug, Clone, Deserialize)]
pub struct HttpSmsConfig {
    /// Gateway API key
    pub api_key: String,
    /// Send endpoint; the balance probe is derived from it
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Optional alphanumeric sender name shown on the handset
    #[serde(default)]
    pub sender_name: Option<String>,
}

/// SMS adapter speaking an sms.ru-style JSON form API
///
/// `connect` probes the account balance endpoint (a cheap authenticated
/// call), `send` posts one form-encoded message per recipient. Phone
/// numbers are normalized by stripping `+`, spaces, and dashes before they
/// hit the wire.
#[derive(Debug)]
pub struct HttpSmsAdapter {
    client: reqwest::Client,
    config: HttpSmsConfig,
}

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    status: String,
    status_text: Option<String>,
}

impl HttpSmsAdapter {
    /// Create an adapter from a parsed credential blob
    pub fn new(config: HttpSmsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    fn balance_url(&self) -> String {
        self.config.api_url.replace("/send", "/my/balance")
    }

    /// Strip formatting characters so the gateway sees bare digits
    fn normalize_phone(recipient: &str) -> String {
        recipient
            .chars()
            .filter(|c| !matches!(c, '+' | ' ' | '-'))
            .collect()
    }
}

#[async_trait]
impl ChannelAdapter for HttpSmsAdapter {
    async fn connect(&self) -> Result<(), ConnectError> {
        let response = self
            .client
            .get(self.balance_url())
            .query(&[("api_id", self.config.api_key.as_str()), ("json", "1")])
            .send()
            .await
            .map_err(|e| ConnectError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ConnectError::Unreachable(format!(
                "balance probe returned {}",
                response.status()
            )));
        }

        let body: GatewayResponse = response
            .json()
            .await
            .map_err(|e| ConnectError::Unreachable(e.to_string()))?;
        if body.status != "OK" {
            return Err(ConnectError::Auth(
                body.status_text.unwrap_or(body.status),
            ));
        }

        tracing::debug!(adapter = self.name(), "SMS gateway probe succeeded");
        Ok(())
    }

    async fn send(
        &self,
        recipient: &str,
        text: &str,
        _subject: Option<&str>,
    ) -> Result<(), SendError> {
        let phone = Self::normalize_phone(recipient);
        if phone.is_empty() || !phone.chars().all(|c| c.is_ascii_digit()) {
            return Err(SendError::InvalidRecipient(format!(
                "not a phone number: {recipient}"
            )));
        }

        let mut form = vec![
            ("api_id", self.config.api_key.clone()),
            ("to", phone),
            ("msg", text.to_string()),
            ("json", "1".to_string()),
        ];
        if let Some(from) = &self.config.sender_name {
            form.push(("from", from.clone()));
        }

        let response = self
            .client
            .post(&self.config.api_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SendError::Transport(format!(
                "gateway returned {}",
                response.status()
            )));
        }

        let body: GatewayResponse = response
            .json()
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;
        if body.status != "OK" {
            return Err(SendError::Rejected(
                body.status_text.unwrap_or(body.status),
            ));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "http-sms"
    }
}
