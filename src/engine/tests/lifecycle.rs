//! Shutdown and startup-recovery behavior.

use crate::engine::test_helpers::*;
use crate::engine::CampaignEngine;
use crate::error::Error;
use crate::types::{CampaignStatus, Event};

#[tokio::test]
async fn shutdown_parks_a_running_campaign_as_paused() {
    // Slow sends keep the worker busy long enough for shutdown to catch it
    let adapter = ScriptedAdapter::slow(std::time::Duration::from_millis(200));
    let identifiers: Vec<String> = (1..=20).map(|i| format!("r{i}")).collect();
    let refs: Vec<&str> = identifiers.iter().map(|s| s.as_str()).collect();
    let directory = StaticDirectory::of(&refs);
    let (engine, _notifier, _tmp) = create_test_engine(adapter, directory).await;
    let id = seed_campaign(&engine, 2, 0).await;

    let mut rx = engine.subscribe();
    engine.start(id).await.unwrap();

    // Wait until dispatch is underway, then shut down mid-run
    loop {
        if let Ok(Event::Started { .. }) = rx.recv().await {
            break;
        }
    }
    engine.shutdown().await.unwrap();

    let campaign = engine.db.get_campaign(id).await.unwrap().unwrap();
    assert_eq!(
        campaign.status,
        CampaignStatus::Paused.to_i32(),
        "interrupted campaign must be parked for later resume"
    );
    assert!(
        campaign.sent_count + campaign.failed_count <= campaign.total_contacts,
        "counters must stay consistent through shutdown"
    );
    assert!(
        !engine.db.was_unclean_shutdown().await.unwrap(),
        "graceful shutdown must leave the clean marker"
    );
}

#[tokio::test]
async fn shutdown_rejects_new_starts_and_resumes() {
    let (engine, _notifier, _tmp) =
        create_test_engine(ScriptedAdapter::succeeding(), StaticDirectory::empty()).await;
    let draft = seed_campaign(&engine, 10, 0).await;
    let paused = seed_campaign(&engine, 10, 0).await;
    engine.db.try_start_campaign(paused).await.unwrap();
    engine.db.try_pause_campaign(paused).await.unwrap();

    engine.shutdown().await.unwrap();

    assert!(matches!(
        engine.start(draft).await.unwrap_err(),
        Error::ShuttingDown
    ));
    assert!(matches!(
        engine.resume(paused).await.unwrap_err(),
        Error::ShuttingDown
    ));
}

#[tokio::test]
async fn shutdown_emits_the_shutdown_event() {
    let (engine, _notifier, _tmp) =
        create_test_engine(ScriptedAdapter::succeeding(), StaticDirectory::empty()).await;

    let mut rx = engine.subscribe();
    engine.shutdown().await.unwrap();

    let event = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, Event::Shutdown));
}

#[tokio::test]
async fn startup_after_crash_demotes_stranded_running_campaigns() {
    let (engine, _notifier, tmp) =
        create_test_engine(ScriptedAdapter::succeeding(), StaticDirectory::empty()).await;
    let id = seed_campaign(&engine, 10, 0).await;
    // Claim the campaign but never run a worker, then "crash" (no shutdown)
    engine.db.try_start_campaign(id).await.unwrap();
    drop(engine);

    let mut config = crate::config::EngineConfig::default();
    config.persistence.database_path = tmp.path().join("test.db");
    let recovered = CampaignEngine::new(config).await.unwrap();

    assert_eq!(
        recovered.db.get_campaign_status(id).await.unwrap(),
        Some(CampaignStatus::Paused),
        "campaign stranded in Running must come back resumable"
    );
}

#[tokio::test]
async fn startup_after_clean_shutdown_leaves_paused_campaigns_alone() {
    let (engine, _notifier, tmp) =
        create_test_engine(ScriptedAdapter::succeeding(), StaticDirectory::empty()).await;
    let id = seed_campaign(&engine, 10, 0).await;
    engine.db.try_start_campaign(id).await.unwrap();
    engine.db.try_pause_campaign(id).await.unwrap();
    engine.shutdown().await.unwrap();
    drop(engine);

    let mut config = crate::config::EngineConfig::default();
    config.persistence.database_path = tmp.path().join("test.db");
    let recovered = CampaignEngine::new(config).await.unwrap();

    assert_eq!(
        recovered.db.get_campaign_status(id).await.unwrap(),
        Some(CampaignStatus::Paused)
    );
}
