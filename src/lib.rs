//! # bulksend
//!
//! Embeddable multi-channel campaign dispatch engine.
//!
//! bulksend turns a persisted campaign definition plus a resolved recipient
//! list into a controlled, observable sequence of per-recipient send
//! attempts, with batching, inter-message delay, cooperative pause/resume/
//! stop, and failure isolation (one bad recipient never aborts a run).
//!
//! ## Design Philosophy
//!
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to events, no polling required
//! - **Crash-safe** - Counters checkpoint after every batch; interrupted
//!   campaigns come back resumable
//! - **Pluggable seams** - Channel adapters, the recipient directory, and
//!   the terminal notification sink are all traits
//!
//! ## Quick Start
//!
//! ```no_run
//! use bulksend::{CampaignEngine, EngineConfig};
//! use bulksend::db::{NewCampaign, NewSender};
//! use bulksend::types::ChannelType;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = CampaignEngine::new(EngineConfig::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = engine.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let sender_id = engine.db.insert_sender(&NewSender {
//!         user_id: 1,
//!         name: "newsletter bot".to_string(),
//!         channel: ChannelType::Chat.to_i32(),
//!         config: serde_json::json!({ "token": "bot-token" }),
//!         is_active: true,
//!     }).await?;
//!
//!     let campaign_id = engine.db.insert_campaign(&NewCampaign {
//!         user_id: 1,
//!         name: "spring sale".to_string(),
//!         channel: ChannelType::Chat.to_i32(),
//!         sender_id: Some(sender_id),
//!         subject: None,
//!         message: "Hello {first_name}! Sale ends {datetime}.".to_string(),
//!         batch_size: 10,
//!         delay_seconds: 1,
//!         retry_failed: false,
//!     }).await?;
//!
//!     engine.start(campaign_id).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Channel adapters (chat, email, SMS) and the adapter registry
pub mod adapters;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Core dispatch engine (decomposed into focused submodules)
pub mod engine;
/// Error types
pub mod error;
/// Retry logic with exponential backoff
pub mod retry;
/// Message template rendering
pub mod templater;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use adapters::{AdapterRegistry, ChannelAdapter};
pub use config::{EngineConfig, WebhookConfig};
pub use db::Database;
pub use engine::{
    CampaignEngine, ContactDirectory, NoopNotifier, NotificationSink, RecipientDirectory,
    WebhookNotifier,
};
pub use error::{
    ConnectError, DatabaseError, DispatchError, Error, Result, SendError,
};
pub use types::{
    CampaignId, CampaignOutcome, CampaignProgress, CampaignStatus, ChannelType, Event, LogStatus,
    Recipient,
};

/// Helper function to run the engine with graceful signal handling.
///
/// Waits for a termination signal and then calls the engine's `shutdown()`
/// method, parking running campaigns as `Paused` for later resume.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal
///   registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use bulksend::{CampaignEngine, EngineConfig, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let engine = CampaignEngine::new(EngineConfig::default()).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(engine).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(engine: CampaignEngine) -> Result<()> {
    wait_for_signal().await;
    engine.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    // Handler registration can fail in restricted environments; anything we
    // cannot register falls back to the portable ctrl_c listener
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable, listening for ctrl_c only");
            wait_for_ctrl_c().await;
            return;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(error = %e, "SIGINT handler unavailable, listening for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("shutdown signal received (SIGTERM)");
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("shutdown signal received (SIGTERM)"),
        _ = sigint.recv() => tracing::info!("shutdown signal received (SIGINT)"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received (ctrl_c)"),
        Err(e) => tracing::error!(error = %e, "ctrl_c listener failed"),
    }
}
