//! Graceful shutdown coordination.

use crate::error::Result;
use crate::types::Event;

use super::CampaignEngine;

impl CampaignEngine {
    /// Gracefully shut down the engine
    ///
    /// Shutdown sequence:
    /// 1. Stop accepting new starts and resumes
    /// 2. Signal every active worker's cancellation token
    /// 3. Wait (bounded by `dispatch.shutdown_grace`) for workers to reach a
    ///    batch boundary and park their campaigns as `Paused`
    /// 4. Mark clean shutdown in the database
    ///
    /// Campaigns parked this way resume exactly where they left off via
    /// [`resume`](Self::resume) after the next startup.
    ///
    /// # Errors
    ///
    /// Returns an error if database operations fail during shutdown. The
    /// method attempts to complete as much of the sequence as possible even
    /// if some steps fail.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("initiating graceful shutdown");

        // 1. Stop accepting new work
        self.workers
            .accepting_new
            .store(false, std::sync::atomic::Ordering::SeqCst);

        // 2. Signal every active worker
        {
            let active = self.workers.active_campaigns.lock().await;
            tracing::debug!(active_count = active.len(), "signaling active workers");
            for (id, token) in active.iter() {
                tracing::debug!(campaign_id = id.0, "signaling worker shutdown");
                token.cancel();
            }
        }

        // 3. Bounded wait for workers to park and deregister
        let wait_result = tokio::time::timeout(
            self.config.dispatch.shutdown_grace,
            self.wait_for_workers(),
        )
        .await;
        match wait_result {
            Ok(()) => tracing::info!("all workers parked gracefully"),
            Err(_) => {
                // Workers that missed the grace window leave their campaigns
                // Running; demote them now so they stay resumable
                tracing::warn!("timeout waiting for workers to park");
                match self.db.demote_stranded_running().await {
                    Ok(demoted) if demoted > 0 => {
                        tracing::warn!(demoted, "demoted stranded running campaigns to paused");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!(error = %e, "failed to demote stranded campaigns"),
                }
            }
        }

        // 4. Mark clean shutdown
        if let Err(e) = self.db.set_clean_shutdown().await {
            tracing::error!(error = %e, "failed to mark clean shutdown in database");
        }

        self.emit_event(Event::Shutdown);
        tracing::info!("graceful shutdown complete");
        Ok(())
    }

    /// Wait for the active worker map to drain
    async fn wait_for_workers(&self) {
        loop {
            let active_count = self.workers.active_campaigns.lock().await.len();
            if active_count == 0 {
                return;
            }
            tracing::debug!(active_count, "waiting for workers to park");
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }
}
