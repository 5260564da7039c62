//! Configuration types for bulksend

use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Dispatch behavior configuration (batching fallback, timeouts)
///
/// Groups settings that shape how a dispatch worker paces its sends. The
/// inter-message delay is always per-campaign (`delay_seconds` on the
/// campaign row); only the batch size has an engine-level fallback, applied
/// when a campaign row carries a non-positive `batch_size`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Batch size applied when a campaign does not set one (default: 10)
    #[serde(default = "default_batch_size")]
    pub default_batch_size: usize,

    /// Bounded timeout applied to every adapter send call (default: 30 seconds)
    ///
    /// Distinct from the inter-message delay: a hung provider call is cut
    /// off after this long and counted as a failed send, so one stuck
    /// recipient cannot stall the worker indefinitely.
    #[serde(default = "default_send_timeout", with = "duration_serde")]
    pub send_timeout: Duration,

    /// How long shutdown waits for active workers to reach a batch boundary
    /// (default: 30 seconds)
    #[serde(default = "default_shutdown_grace", with = "duration_serde")]
    pub shutdown_grace: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_batch_size: default_batch_size(),
            send_timeout: default_send_timeout(),
            shutdown_grace: default_shutdown_grace(),
        }
    }
}

/// Persistence configuration (database path, checkpoint retry)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Path to the SQLite database file (default: "./bulksend.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Retry policy for counter checkpoints and log appends
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry configuration for transient persistence failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Terminal notification configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Webhook to POST terminal campaign outcomes to (None = no webhook)
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,
}

/// A single outcome webhook target
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Target URL for the POST request
    pub url: String,

    /// Request timeout (default: 10 seconds)
    #[serde(default = "default_webhook_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Optional Authorization header value
    #[serde(default)]
    pub auth_header: Option<String>,
}

/// Main configuration for the campaign engine
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Dispatch pacing and timeout settings
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Database and checkpoint-retry settings
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Terminal notification settings
    #[serde(default)]
    pub notifications: NotificationConfig,
}

impl EngineConfig {
    /// Validate the configuration, returning a descriptive error for the
    /// first invalid setting found.
    pub fn validate(&self) -> crate::Result<()> {
        if self.dispatch.default_batch_size == 0 {
            return Err(crate::Error::Config {
                message: "default_batch_size must be at least 1".to_string(),
                key: Some("dispatch.default_batch_size".to_string()),
            });
        }

        if self.dispatch.send_timeout.is_zero() {
            return Err(crate::Error::Config {
                message: "send_timeout must be non-zero".to_string(),
                key: Some("dispatch.send_timeout".to_string()),
            });
        }

        if self.persistence.retry.backoff_multiplier < 1.0 {
            return Err(crate::Error::Config {
                message: "backoff_multiplier must be >= 1.0".to_string(),
                key: Some("persistence.retry.backoff_multiplier".to_string()),
            });
        }

        if let Some(webhook) = &self.notifications.webhook {
            url::Url::parse(&webhook.url).map_err(|e| crate::Error::Config {
                message: format!("invalid webhook URL '{}': {}", webhook.url, e),
                key: Some("notifications.webhook.url".to_string()),
            })?;
        }

        Ok(())
    }
}

fn default_batch_size() -> usize {
    10
}

fn default_send_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_shutdown_grace() -> Duration {
    Duration::from_secs(30)
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./bulksend.db")
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_webhook_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (seconds as u64)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let mut config = EngineConfig::default();
        config.dispatch.default_batch_size = 0;
        let err = config.validate().unwrap_err();
        assert!(
            err.to_string().contains("default_batch_size"),
            "error should name the offending key, got: {err}"
        );
    }

    #[test]
    fn invalid_webhook_url_is_rejected() {
        let mut config = EngineConfig::default();
        config.notifications.webhook = Some(WebhookConfig {
            url: "not a url".to_string(),
            timeout: Duration::from_secs(10),
            auth_header: None,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_json_deserializes_to_defaults() {
        let parsed: EngineConfig = serde_json::from_str("{}").unwrap();
        let defaults = EngineConfig::default();
        assert_eq!(
            parsed.dispatch.default_batch_size,
            defaults.dispatch.default_batch_size
        );
        assert_eq!(parsed.dispatch.send_timeout, defaults.dispatch.send_timeout);
        assert_eq!(
            parsed.persistence.retry.max_attempts,
            defaults.persistence.retry.max_attempts
        );
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(
            parsed.dispatch.default_batch_size,
            config.dispatch.default_batch_size
        );
        assert_eq!(parsed.dispatch.send_timeout, config.dispatch.send_timeout);
    }
}
