//! Chat delivery through an HTTP bot API.

use crate::error::{ConnectError, SendError};
use serde::Deserialize;
use std::time::Duration;

use super::ChannelAdapter;
use async_trait::async_trait;

const DEFAULT_API_URL: &str = "https://api.telegram.org";

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

/// Credential blob shape for [`ChatBotAdapter`]
#[derive(Debug, Clone, Deserialize)]
pub struct ChatBotConfig {
    /// Bot token issued by the chat network
    pub token: String,
    /// Base URL of the bot API (override for self-hosted gateways and tests)
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

/// Chat adapter speaking the bot-API wire format
///
/// `connect` probes `getMe` to validate the token; `send` posts one
/// `sendMessage` per recipient. The recipient identifier is passed through
/// as the `chat_id`, so numeric IDs and `@username` handles both work.
#[derive(Debug)]
pub struct ChatBotAdapter {
    client: reqwest::Client,
    config: ChatBotConfig,
}

#[derive(Debug, Deserialize)]
struct BotApiResponse {
    ok: bool,
    description: Option<String>,
}

impl ChatBotAdapter {
    /// Create an adapter from a parsed credential blob
    pub fn new(config: ChatBotConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.config.api_url.trim_end_matches('/'),
            self.config.token
        )
    }
}

#[async_trait]
impl ChannelAdapter for ChatBotAdapter {
    async fn connect(&self) -> Result<(), ConnectError> {
        let response = self
            .client
            .get(self.method_url("getMe"))
            .send()
            .await
            .map_err(|e| ConnectError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ConnectError::Auth(format!("bot API returned {status}")));
        }

        let body: BotApiResponse = response
            .json()
            .await
            .map_err(|e| ConnectError::Unreachable(e.to_string()))?;
        if !body.ok {
            return Err(ConnectError::Auth(
                body.description.unwrap_or_else(|| "getMe failed".to_string()),
            ));
        }

        tracing::debug!(adapter = self.name(), "bot API probe succeeded");
        Ok(())
    }

    async fn send(
        &self,
        recipient: &str,
        text: &str,
        _subject: Option<&str>,
    ) -> Result<(), SendError> {
        let payload = serde_json::json!({
            "chat_id": recipient,
            "text": text,
        });

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;

        let status = response.status();
        let body: BotApiResponse = response
            .json()
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;

        if body.ok {
            return Ok(());
        }

        let description = body
            .description
            .unwrap_or_else(|| format!("bot API returned {status}"));
        // 400 from the bot API almost always means the chat_id cannot be resolved
        if status == reqwest::StatusCode::BAD_REQUEST {
            Err(SendError::InvalidRecipient(description))
        } else {
            Err(SendError::Rejected(description))
        }
    }

    fn name(&self) -> &'static str {
        "chat-bot"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter_for(server: &MockServer) -> ChatBotAdapter {
        ChatBotAdapter::new(ChatBotConfig {
            token: "test-token".to_string(),
            api_url: server.uri(),
        })
    }

    #[tokio::test]
    async fn connect_succeeds_on_ok_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bottest-token/getMe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": {"id": 42, "is_bot": true, "first_name": "bulk"}
            })))
            .mount(&server)
            .await;

        adapter_for(&server).connect().await.unwrap();
    }

    #[tokio::test]
    async fn connect_maps_unauthorized_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bottest-token/getMe"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = adapter_for(&server).connect().await.unwrap_err();
        assert!(matches!(err, ConnectError::Auth(_)));
    }

    #[tokio::test]
    async fn send_posts_chat_id_and_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bottest-token/sendMessage"))
            .and(body_partial_json(serde_json::json!({
                "chat_id": "@somebody",
                "text": "hello there",
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"ok": true, "result": {}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        adapter_for(&server)
            .send("@somebody", "hello there", None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn send_maps_bad_request_to_invalid_recipient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bottest-token/sendMessage"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "ok": false,
                "description": "Bad Request: chat not found"
            })))
            .mount(&server)
            .await;

        let err = adapter_for(&server)
            .send("nope", "hello", None)
            .await
            .unwrap_err();
        assert!(matches!(err, SendError::InvalidRecipient(_)));
    }

    #[tokio::test]
    async fn send_maps_other_failures_to_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bottest-token/sendMessage"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "ok": false,
                "description": "Too Many Requests: retry after 5"
            })))
            .mount(&server)
            .await;

        let err = adapter_for(&server)
            .send("@somebody", "hello", None)
            .await
            .unwrap_err();
        assert!(matches!(err, SendError::Rejected(_)));
    }
}
