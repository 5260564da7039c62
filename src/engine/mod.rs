//! Core campaign dispatch engine split into focused submodules.
//!
//! The `CampaignEngine` struct and its methods are organized by domain:
//! - [`control`] - Campaign control verbs (start/pause/resume/stop)
//! - [`dispatch`] - The per-campaign worker and batch loop
//! - [`directory`] - Recipient directory seam and SQLite implementation
//! - [`notify`] - Terminal notification seam and webhook implementation
//! - [`lifecycle`] - Startup recovery and graceful shutdown

mod control;
mod directory;
mod dispatch;
mod lifecycle;
mod notify;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use directory::{ContactDirectory, RecipientDirectory};
pub use notify::{NoopNotifier, NotificationSink, WebhookNotifier};

use crate::adapters::AdapterRegistry;
use crate::config::EngineConfig;
use crate::db::Database;
use crate::error::Result;
use crate::types::{CampaignId, CampaignProgress, CampaignStatus};

/// Worker tracking state shared by the control verbs and shutdown
#[derive(Clone)]
pub(crate) struct WorkerState {
    /// Map of active campaign workers to their cancellation tokens
    pub(crate) active_campaigns: std::sync::Arc<
        tokio::sync::Mutex<
            std::collections::HashMap<CampaignId, tokio_util::sync::CancellationToken>,
        >,
    >,
    /// Flag to indicate whether new starts are accepted (false during shutdown)
    pub(crate) accepting_new: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

/// Main engine instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct CampaignEngine {
    /// Database instance for persistence (wrapped in Arc for sharing across tasks)
    /// Public for integration tests to seed campaigns and query state
    pub db: std::sync::Arc<Database>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<crate::types::Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: std::sync::Arc<EngineConfig>,
    /// Channel adapter registry (lookup from channel type to adapter factory)
    pub(crate) adapters: std::sync::Arc<AdapterRegistry>,
    /// Recipient directory collaborator
    pub(crate) directory: std::sync::Arc<dyn RecipientDirectory>,
    /// Terminal notification collaborator
    pub(crate) notifier: std::sync::Arc<dyn NotificationSink>,
    /// Worker tracking state
    pub(crate) workers: WorkerState,
}

impl CampaignEngine {
    /// Create a new CampaignEngine instance
    ///
    /// This initializes all core components:
    /// - Validates the configuration
    /// - Opens/creates the SQLite database and runs migrations
    /// - Demotes campaigns stranded in `Running` by an unclean shutdown to
    ///   `Paused` so they can be resumed explicitly
    /// - Sets up the event broadcast channel
    ///
    /// The default collaborators are the built-in adapter registry, the
    /// SQLite-backed contact directory, and a webhook notifier when one is
    /// configured (a no-op sink otherwise). Swap any of them with the
    /// `with_*` methods before starting campaigns.
    pub async fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let db = Database::new(&config.persistence.database_path).await?;

        // Recover from a crash before accepting any work: a campaign left in
        // Running has no worker and would otherwise be unstartable forever.
        if db.was_unclean_shutdown().await? {
            let demoted = db.demote_stranded_running().await?;
            if demoted > 0 {
                tracing::warn!(
                    demoted,
                    "unclean shutdown detected; demoted stranded running campaigns to paused"
                );
            }
        }

        // Mark that we're starting up (for unclean shutdown detection)
        db.set_clean_start().await?;

        // Buffer of 1000 events; slow subscribers see RecvError::Lagged
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        let db = std::sync::Arc::new(db);

        let notifier: std::sync::Arc<dyn NotificationSink> =
            match &config.notifications.webhook {
                Some(webhook) => std::sync::Arc::new(WebhookNotifier::new(webhook.clone())),
                None => std::sync::Arc::new(NoopNotifier),
            };

        let workers = WorkerState {
            active_campaigns: std::sync::Arc::new(tokio::sync::Mutex::new(
                std::collections::HashMap::new(),
            )),
            accepting_new: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true)),
        };

        Ok(Self {
            directory: std::sync::Arc::new(ContactDirectory::new(db.clone())),
            db,
            event_tx,
            config: std::sync::Arc::new(config),
            adapters: std::sync::Arc::new(AdapterRegistry::builtin()),
            notifier,
            workers,
        })
    }

    /// Replace the channel adapter registry
    ///
    /// Call before starting any campaign; workers capture the registry at
    /// start time.
    pub fn with_adapters(mut self, adapters: AdapterRegistry) -> Self {
        self.adapters = std::sync::Arc::new(adapters);
        self
    }

    /// Replace the recipient directory collaborator
    pub fn with_directory(mut self, directory: std::sync::Arc<dyn RecipientDirectory>) -> Self {
        self.directory = directory;
        self
    }

    /// Replace the terminal notification collaborator
    pub fn with_notifier(mut self, notifier: std::sync::Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Subscribe to campaign events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all
    /// events independently. Events are buffered, but if a subscriber falls
    /// behind by more than 1000 events, it will receive a
    /// `RecvError::Lagged` error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use bulksend::{CampaignEngine, EngineConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let engine = CampaignEngine::new(EngineConfig::default()).await?;
    ///
    ///     let mut events = engine.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             tracing::info!(?event, "campaign event");
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<crate::types::Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> std::sync::Arc<EngineConfig> {
        std::sync::Arc::clone(&self.config)
    }

    /// Read-only progress snapshot of one campaign
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::error::Error::NotFound) if the
    /// campaign does not exist.
    pub async fn progress(&self, id: CampaignId) -> Result<CampaignProgress> {
        let campaign = self
            .db
            .get_campaign(id)
            .await?
            .ok_or_else(|| crate::error::Error::NotFound(format!("campaign {id}")))?;

        let to_datetime = |ts: i64| {
            chrono::DateTime::from_timestamp(ts, 0).unwrap_or(chrono::DateTime::UNIX_EPOCH)
        };

        Ok(CampaignProgress {
            id,
            status: CampaignStatus::from_i32(campaign.status),
            total_contacts: campaign.total_contacts,
            sent_count: campaign.sent_count,
            failed_count: campaign.failed_count,
            created_at: to_datetime(campaign.created_at),
            started_at: campaign.started_at.map(to_datetime),
            completed_at: campaign.completed_at.map(to_datetime),
        })
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers the event is silently dropped so
    /// dispatch continues whether or not anyone is listening.
    pub(crate) fn emit_event(&self, event: crate::types::Event) {
        self.event_tx.send(event).ok();
    }
}
