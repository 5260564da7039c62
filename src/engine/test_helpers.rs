//! Shared test helpers for creating CampaignEngine instances in tests.

use crate::adapters::{AdapterRegistry, ChannelAdapter};
use crate::config::EngineConfig;
use crate::db::{NewCampaign, NewSender};
use crate::engine::{CampaignEngine, NotificationSink, RecipientDirectory};
use crate::error::{ConnectError, Result, SendError};
use crate::types::{CampaignId, CampaignOutcome, ChannelType, Recipient};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::tempdir;
use tokio::sync::Mutex;

/// Adapter whose behavior is scripted per test.
///
/// Records every send in order; fails recipients listed in
/// `failing_identifiers`; optionally delays each send to widen race windows
/// in pause/shutdown tests.
pub(crate) struct ScriptedAdapter {
    pub(crate) sends: Mutex<Vec<String>>,
    pub(crate) failing_identifiers: HashSet<String>,
    pub(crate) send_delay: std::time::Duration,
    pub(crate) connect_delay: std::time::Duration,
    pub(crate) connect_error: Option<String>,
}

impl ScriptedAdapter {
    pub(crate) fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            sends: Mutex::new(Vec::new()),
            failing_identifiers: HashSet::new(),
            send_delay: std::time::Duration::ZERO,
            connect_delay: std::time::Duration::ZERO,
            connect_error: None,
        })
    }

    pub(crate) fn failing_for(identifiers: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            sends: Mutex::new(Vec::new()),
            failing_identifiers: identifiers.iter().map(|s| s.to_string()).collect(),
            send_delay: std::time::Duration::ZERO,
            connect_delay: std::time::Duration::ZERO,
            connect_error: None,
        })
    }

    pub(crate) fn slow(send_delay: std::time::Duration) -> Arc<Self> {
        Arc::new(Self {
            sends: Mutex::new(Vec::new()),
            failing_identifiers: HashSet::new(),
            send_delay,
            connect_delay: std::time::Duration::ZERO,
            connect_error: None,
        })
    }

    pub(crate) fn failing_connect(reason: &str, connect_delay: std::time::Duration) -> Arc<Self> {
        Arc::new(Self {
            sends: Mutex::new(Vec::new()),
            failing_identifiers: HashSet::new(),
            send_delay: std::time::Duration::ZERO,
            connect_delay,
            connect_error: Some(reason.to_string()),
        })
    }

    pub(crate) async fn sent_identifiers(&self) -> Vec<String> {
        self.sends.lock().await.clone()
    }
}

#[async_trait]
impl ChannelAdapter for ScriptedAdapter {
    async fn connect(&self) -> std::result::Result<(), ConnectError> {
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        match &self.connect_error {
            Some(reason) => Err(ConnectError::Auth(reason.clone())),
            None => Ok(()),
        }
    }

    async fn send(
        &self,
        recipient: &str,
        _text: &str,
        _subject: Option<&str>,
    ) -> std::result::Result<(), SendError> {
        if !self.send_delay.is_zero() {
            tokio::time::sleep(self.send_delay).await;
        }
        self.sends.lock().await.push(recipient.to_string());
        if self.failing_identifiers.contains(recipient) {
            Err(SendError::Rejected("scripted failure".to_string()))
        } else {
            Ok(())
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Directory returning a fixed recipient list regardless of owner/channel.
pub(crate) struct StaticDirectory {
    recipients: Vec<Recipient>,
}

impl StaticDirectory {
    pub(crate) fn of(identifiers: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            recipients: identifiers.iter().map(|i| Recipient::new(*i)).collect(),
        })
    }

    pub(crate) fn empty() -> Arc<Self> {
        Arc::new(Self { recipients: vec![] })
    }
}

#[async_trait]
impl RecipientDirectory for StaticDirectory {
    async fn recipients(&self, _user_id: i64, _channel: ChannelType) -> Result<Vec<Recipient>> {
        Ok(self.recipients.clone())
    }
}

/// Sink recording every terminal outcome it receives.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    pub(crate) outcomes: Mutex<Vec<CampaignOutcome>>,
}

impl RecordingNotifier {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) async fn recorded(&self) -> Vec<CampaignOutcome> {
        self.outcomes.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn notify(&self, outcome: &CampaignOutcome) -> Result<()> {
        self.outcomes.lock().await.push(outcome.clone());
        Ok(())
    }
}

/// Create a test engine wired to a scripted chat adapter, a static
/// directory, and a recording notifier. Returns the engine, its
/// collaborator doubles, and the tempdir (which must be kept alive).
pub(crate) async fn create_test_engine(
    adapter: Arc<ScriptedAdapter>,
    directory: Arc<StaticDirectory>,
) -> (
    CampaignEngine,
    Arc<RecordingNotifier>,
    tempfile::TempDir,
) {
    create_test_engine_with(adapter, directory, |_| {}).await
}

/// Like [`create_test_engine`] but lets the test tweak the configuration
/// before the engine is built.
pub(crate) async fn create_test_engine_with(
    adapter: Arc<ScriptedAdapter>,
    directory: Arc<StaticDirectory>,
    customize: impl FnOnce(&mut EngineConfig),
) -> (
    CampaignEngine,
    Arc<RecordingNotifier>,
    tempfile::TempDir,
) {
    let temp_dir = tempdir().unwrap();

    let mut config = EngineConfig::default();
    config.persistence.database_path = temp_dir.path().join("test.db");
    // Fast retries so persistence-retry paths don't slow tests down
    config.persistence.retry.initial_delay = std::time::Duration::from_millis(5);
    config.persistence.retry.max_delay = std::time::Duration::from_millis(20);
    config.dispatch.shutdown_grace = std::time::Duration::from_secs(5);
    customize(&mut config);

    let mut registry = AdapterRegistry::new();
    let adapter_for_factory = adapter.clone();
    registry.register(ChannelType::Chat, move |_| {
        Ok(adapter_for_factory.clone() as Arc<dyn ChannelAdapter>)
    });

    let notifier = RecordingNotifier::new();

    let engine = CampaignEngine::new(config)
        .await
        .unwrap()
        .with_adapters(registry)
        .with_directory(directory)
        .with_notifier(notifier.clone());

    (engine, notifier, temp_dir)
}

/// Insert an active chat sender and a draft campaign pointing at it.
pub(crate) async fn seed_campaign(
    engine: &CampaignEngine,
    batch_size: i64,
    delay_seconds: i64,
) -> CampaignId {
    let sender_id = engine
        .db
        .insert_sender(&NewSender {
            user_id: 1,
            name: "test sender".to_string(),
            channel: ChannelType::Chat.to_i32(),
            config: serde_json::json!({}),
            is_active: true,
        })
        .await
        .unwrap();

    engine
        .db
        .insert_campaign(&NewCampaign {
            user_id: 1,
            name: "test campaign".to_string(),
            channel: ChannelType::Chat.to_i32(),
            sender_id: Some(sender_id),
            subject: None,
            message: "Hello {first_name}!".to_string(),
            batch_size,
            delay_seconds,
            retry_failed: false,
        })
        .await
        .unwrap()
}

/// Wait until the campaign reaches the given status, panicking after 10s.
pub(crate) async fn wait_for_status(
    engine: &CampaignEngine,
    id: CampaignId,
    status: crate::types::CampaignStatus,
) {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(10);
    loop {
        let current = engine.db.get_campaign_status(id).await.unwrap();
        if current == Some(status) {
            return;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("campaign {id} never reached {status}, last seen {current:?}");
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
}

/// Wait until the active worker map no longer contains the campaign.
pub(crate) async fn wait_for_worker_exit(engine: &CampaignEngine, id: CampaignId) {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(10);
    loop {
        if !engine.workers.active_campaigns.lock().await.contains_key(&id) {
            return;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("worker for campaign {id} never exited");
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
}
