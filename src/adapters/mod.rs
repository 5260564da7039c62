//! Channel adapters
//!
//! A [`ChannelAdapter`] abstracts a delivery provider behind two calls:
//! a `connect` probe run once before a campaign starts dispatching, and a
//! per-recipient `send`. The dispatch loop never cares which provider sits
//! behind the trait; a failed probe fails the whole run, a failed send only
//! fails that recipient.
//!
//! Built-in implementations:
//! - [`ChatBotAdapter`] — chat delivery through an HTTP bot API
//! - [`SmtpAdapter`] — email delivery through async SMTP
//! - [`HttpSmsAdapter`] — SMS delivery through an HTTP gateway
//!
//! Custom providers plug in through [`AdapterRegistry::register`].

use crate::error::{ConnectError, SendError};
use crate::types::ChannelType;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

mod chat;
mod email;
mod sms;

pub use chat::{ChatBotAdapter, ChatBotConfig};
pub use email::{SmtpAdapter, SmtpConfig};
pub use sms::{HttpSmsAdapter, HttpSmsConfig};

/// Trait for message delivery providers
///
/// Implementations must be cheap to construct: the registry builds a fresh
/// adapter per campaign run from the sender's credential blob, and drops it
/// when the run finishes.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Probe the provider before dispatch starts
    ///
    /// Called once per campaign run. A failure here marks the whole campaign
    /// as failed without attempting any recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are rejected, the provider is
    /// unreachable, or the configuration blob is unusable.
    async fn connect(&self) -> Result<(), ConnectError>;

    /// Deliver one message to one recipient
    ///
    /// `subject` is populated only for channels that carry one; adapters for
    /// subjectless channels ignore it.
    ///
    /// # Errors
    ///
    /// Returns an error describing why this recipient could not be reached.
    /// The caller records it and moves on; it never aborts the run.
    async fn send(
        &self,
        recipient: &str,
        text: &str,
        subject: Option<&str>,
    ) -> Result<(), SendError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Factory closure that builds an adapter from a sender's credential blob
pub type AdapterFactory =
    Box<dyn Fn(&serde_json::Value) -> Result<Arc<dyn ChannelAdapter>, ConnectError> + Send + Sync>;

/// Registry mapping channel types to adapter factories
///
/// [`AdapterRegistry::builtin`] wires the three built-in adapters; callers
/// embedding the engine can override any channel with their own factory.
pub struct AdapterRegistry {
    factories: HashMap<ChannelType, AdapterFactory>,
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("channels", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl AdapterRegistry {
    /// Create an empty registry with no channels wired
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry with the built-in adapters for all three channels
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(ChannelType::Chat, |config| {
            let config: ChatBotConfig = parse_config(config)?;
            Ok(Arc::new(ChatBotAdapter::new(config)) as Arc<dyn ChannelAdapter>)
        });
        registry.register(ChannelType::Email, |config| {
            let config: SmtpConfig = parse_config(config)?;
            Ok(Arc::new(SmtpAdapter::new(config)?) as Arc<dyn ChannelAdapter>)
        });
        registry.register(ChannelType::Sms, |config| {
            let config: HttpSmsConfig = parse_config(config)?;
            Ok(Arc::new(HttpSmsAdapter::new(config)) as Arc<dyn ChannelAdapter>)
        });
        registry
    }

    /// Register (or replace) the factory for a channel
    pub fn register<F>(&mut self, channel: ChannelType, factory: F)
    where
        F: Fn(&serde_json::Value) -> Result<Arc<dyn ChannelAdapter>, ConnectError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(channel, Box::new(factory));
    }

    /// Whether a factory is wired for this channel
    pub fn supports(&self, channel: ChannelType) -> bool {
        self.factories.contains_key(&channel)
    }

    /// Build an adapter for a channel from a sender's credential blob
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Config`] if no factory is registered for the
    /// channel or the blob does not match the adapter's expected shape.
    pub fn build(
        &self,
        channel: ChannelType,
        config: &serde_json::Value,
    ) -> Result<Arc<dyn ChannelAdapter>, ConnectError> {
        let factory = self.factories.get(&channel).ok_or_else(|| {
            ConnectError::Config(format!("no adapter registered for channel {channel}"))
        })?;
        factory(config)
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn parse_config<T: serde::de::DeserializeOwned>(
    config: &serde_json::Value,
) -> Result<T, ConnectError> {
    serde_json::from_value(config.clone()).map_err(|e| ConnectError::Config(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_wires_all_channels() {
        let registry = AdapterRegistry::builtin();
        assert!(registry.supports(ChannelType::Chat));
        assert!(registry.supports(ChannelType::Email));
        assert!(registry.supports(ChannelType::Sms));
    }

    #[test]
    fn empty_registry_rejects_build() {
        let registry = AdapterRegistry::new();
        let result = registry.build(ChannelType::Chat, &serde_json::json!({}));
        assert!(matches!(result, Err(ConnectError::Config(_))));
    }

    #[test]
    fn build_rejects_malformed_credential_blob() {
        let registry = AdapterRegistry::builtin();
        // token is required for the chat adapter
        let result = registry.build(ChannelType::Chat, &serde_json::json!({"wrong": true}));
        assert!(matches!(result, Err(ConnectError::Config(_))));
    }

    #[test]
    fn registered_factory_overrides_builtin() {
        struct Nope;
        #[async_trait]
        impl ChannelAdapter for Nope {
            async fn connect(&self) -> Result<(), ConnectError> {
                Ok(())
            }
            async fn send(&self, _: &str, _: &str, _: Option<&str>) -> Result<(), SendError> {
                Err(SendError::Rejected("always".to_string()))
            }
            fn name(&self) -> &'static str {
                "nope"
            }
        }

        let mut registry = AdapterRegistry::builtin();
        registry.register(ChannelType::Sms, |_| Ok(Arc::new(Nope)));
        let adapter = registry.build(ChannelType::Sms, &serde_json::json!({})).unwrap();
        assert_eq!(adapter.name(), "nope");
    }
}
