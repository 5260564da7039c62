//! Terminal notification seam.

use crate::config::WebhookConfig;
use crate::error::{Error, Result};
use crate::types::CampaignOutcome;
use async_trait::async_trait;

/// Trait for consumers of terminal campaign outcomes
///
/// Called once per campaign run when it reaches `Completed` or `Failed`.
/// A failing sink is logged and ignored: notification delivery never
/// changes a campaign's terminal status.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one terminal outcome
    ///
    /// # Errors
    ///
    /// Returns an error if the outcome could not be delivered. The engine
    /// logs it and moves on.
    async fn notify(&self, outcome: &CampaignOutcome) -> Result<()>;
}

/// Sink that discards every outcome
///
/// The default when no webhook is configured.
#[derive(Debug, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl NotificationSink for NoopNotifier {
    async fn notify(&self, outcome: &CampaignOutcome) -> Result<()> {
        tracing::debug!(
            campaign_id = outcome.campaign_id.0,
            final_status = %outcome.final_status,
            "terminal outcome (no notification sink configured)"
        );
        Ok(())
    }
}

/// Sink that POSTs each outcome as JSON to a configured URL
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    config: WebhookConfig,
}

impl WebhookNotifier {
    /// Create a notifier for the given webhook configuration
    pub fn new(config: WebhookConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookNotifier {
    async fn notify(&self, outcome: &CampaignOutcome) -> Result<()> {
        let mut request = self
            .client
            .post(&self.config.url)
            .json(outcome)
            .timeout(self.config.timeout);

        if let Some(auth) = &self.config.auth_header {
            request = request.header("Authorization", auth);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Error::Other(format!(
                "notification webhook returned status {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        tracing::debug!(
            campaign_id = outcome.campaign_id.0,
            url = %self.config.url,
            "terminal notification delivered"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::types::{CampaignId, CampaignStatus};
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_outcome() -> CampaignOutcome {
        CampaignOutcome {
            campaign_id: CampaignId(7),
            final_status: CampaignStatus::Completed,
            sent_count: 12,
            failed_count: 3,
            total_contacts: 15,
            timestamp: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn posts_outcome_payload_with_auth_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("Authorization", "Bearer secret"))
            .and(body_partial_json(serde_json::json!({
                "campaign_id": 7,
                "final_status": "completed",
                "sent_count": 12,
                "failed_count": 3,
                "total_contacts": 15,
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(WebhookConfig {
            url: format!("{}/hook", server.uri()),
            timeout: Duration::from_secs(5),
            auth_header: Some("Bearer secret".to_string()),
        });

        notifier.notify(&sample_outcome()).await.unwrap();
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(WebhookConfig {
            url: format!("{}/hook", server.uri()),
            timeout: Duration::from_secs(5),
            auth_header: None,
        });

        assert!(notifier.notify(&sample_outcome()).await.is_err());
    }
}
