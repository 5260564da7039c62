//! Campaign control verbs — start, pause, resume, stop.
//!
//! Each verb maps to exactly one lifecycle transition. Verbs are idempotent
//! when the campaign is already in the target state and rejected with
//! [`DispatchError::InvalidState`] for invalid source states. The persisted
//! status is the sole pause/resume/stop signal: workers observe it at batch
//! boundaries, there is no separate command channel.

use crate::error::{DispatchError, Error, Result};
use crate::types::{CampaignId, CampaignStatus};

use super::CampaignEngine;

impl CampaignEngine {
    /// Start a draft campaign
    ///
    /// Atomically claims the campaign (`Draft` → `Running`), stamps
    /// `started_at`, and spawns its dispatch worker. The worker performs
    /// setup asynchronously: a missing or inactive sender fails the
    /// campaign, zero eligible recipients completes it immediately, and
    /// both surface through the event stream and the notification sink.
    ///
    /// # Errors
    ///
    /// - [`Error::ShuttingDown`] if shutdown has begun
    /// - [`Error::NotFound`] if the campaign does not exist
    /// - [`DispatchError::InvalidState`] if the campaign is paused or
    ///   terminal (use [`resume`](Self::resume) for paused campaigns)
    /// - [`DispatchError::AlreadyActive`] if another caller won the claim
    ///   concurrently
    ///
    /// Starting a campaign that is already `Running` is a no-op.
    pub async fn start(&self, id: CampaignId) -> Result<()> {
        self.ensure_accepting()?;

        let campaign = self
            .db
            .get_campaign(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("campaign {id}")))?;

        match CampaignStatus::from_i32(campaign.status) {
            CampaignStatus::Draft => {}
            CampaignStatus::Running => return Ok(()),
            other => {
                return Err(DispatchError::InvalidState {
                    id: id.0,
                    operation: "start".to_string(),
                    current_state: other.to_string(),
                }
                .into());
            }
        }

        // Single-flight: the CAS loses if any concurrent caller got here first
        if !self.db.try_start_campaign(id).await? {
            return Err(DispatchError::AlreadyActive { id: id.0 }.into());
        }

        tracing::info!(campaign_id = id.0, "campaign claimed, spawning worker");
        self.spawn_worker(id).await;
        Ok(())
    }

    /// Pause a running campaign
    ///
    /// Takes effect cooperatively: the worker observes the new status at
    /// the next batch boundary, finishes nothing further, and exits leaving
    /// the status `Paused`. A send already in flight always runs to
    /// completion first.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the campaign does not exist
    /// - [`DispatchError::InvalidState`] if the campaign is a draft or
    ///   terminal
    ///
    /// Pausing an already paused campaign is a no-op.
    pub async fn pause(&self, id: CampaignId) -> Result<()> {
        let campaign = self
            .db
            .get_campaign(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("campaign {id}")))?;

        match CampaignStatus::from_i32(campaign.status) {
            CampaignStatus::Running => {}
            CampaignStatus::Paused => return Ok(()),
            other => {
                return Err(DispatchError::InvalidState {
                    id: id.0,
                    operation: "pause".to_string(),
                    current_state: other.to_string(),
                }
                .into());
            }
        }

        // CAS may lose to a concurrent transition (stop, natural completion);
        // that is not an error, the campaign just is no longer pausable
        if self.db.try_pause_campaign(id).await? {
            tracing::info!(campaign_id = id.0, "pause requested");
        }
        Ok(())
    }

    /// Resume a paused campaign
    ///
    /// Atomically reclaims the campaign (`Paused` → `Running`) and spawns a
    /// fresh worker. The worker re-requests the recipient sequence from the
    /// directory and skips the recipients already processed, so a stable
    /// directory neither re-sends nor skips across a pause/resume cycle.
    ///
    /// # Errors
    ///
    /// - [`Error::ShuttingDown`] if shutdown has begun
    /// - [`Error::NotFound`] if the campaign does not exist
    /// - [`DispatchError::InvalidState`] if the campaign is a draft or
    ///   terminal
    /// - [`DispatchError::AlreadyActive`] if the previous worker has not
    ///   yet reached its batch boundary and exited (retry shortly)
    ///
    /// Resuming a campaign that is already `Running` is a no-op.
    pub async fn resume(&self, id: CampaignId) -> Result<()> {
        self.ensure_accepting()?;

        let campaign = self
            .db
            .get_campaign(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("campaign {id}")))?;

        match CampaignStatus::from_i32(campaign.status) {
            CampaignStatus::Paused => {}
            CampaignStatus::Running => return Ok(()),
            other => {
                return Err(DispatchError::InvalidState {
                    id: id.0,
                    operation: "resume".to_string(),
                    current_state: other.to_string(),
                }
                .into());
            }
        }

        // The old worker may still be winding down toward its batch
        // boundary; never allow two workers for one campaign
        if self.workers.active_campaigns.lock().await.contains_key(&id) {
            return Err(DispatchError::AlreadyActive { id: id.0 }.into());
        }

        if !self.db.try_resume_campaign(id).await? {
            return Err(DispatchError::AlreadyActive { id: id.0 }.into());
        }

        tracing::info!(campaign_id = id.0, "campaign resumed, spawning worker");
        self.spawn_worker(id).await;
        Ok(())
    }

    /// Stop a running or paused campaign
    ///
    /// Explicit early termination: the campaign lands on `Completed` with
    /// `completed_at` set and whatever counters it accumulated. A running
    /// worker observes the terminal status at its next batch boundary and
    /// exits. The terminal notification is emitted here (the worker stays
    /// silent for externally stopped campaigns).
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the campaign does not exist
    /// - [`DispatchError::InvalidState`] if the campaign is a draft or
    ///   already `Failed`
    ///
    /// Stopping an already completed campaign is a no-op.
    pub async fn stop(&self, id: CampaignId) -> Result<()> {
        let campaign = self
            .db
            .get_campaign(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("campaign {id}")))?;

        match CampaignStatus::from_i32(campaign.status) {
            CampaignStatus::Running | CampaignStatus::Paused => {}
            CampaignStatus::Completed => return Ok(()),
            other => {
                return Err(DispatchError::InvalidState {
                    id: id.0,
                    operation: "stop".to_string(),
                    current_state: other.to_string(),
                }
                .into());
            }
        }

        if !self.db.try_stop_campaign(id).await? {
            // Lost to natural completion or a failure; nothing to stop
            return Ok(());
        }

        tracing::info!(campaign_id = id.0, "campaign stopped by operator");

        let campaign = self
            .db
            .get_campaign(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("campaign {id}")))?;
        self.emit_event(crate::types::Event::Completed {
            id,
            sent_count: campaign.sent_count,
            failed_count: campaign.failed_count,
        });
        self.notify_terminal(&campaign, CampaignStatus::Completed).await;
        Ok(())
    }

    /// Pause every running campaign
    ///
    /// Convenience for operators; returns how many campaigns were moved to
    /// `Paused`. Workers observe the change at their next batch boundary.
    pub async fn pause_all(&self) -> Result<u64> {
        let running = self
            .db
            .list_campaigns_by_status(CampaignStatus::Running.to_i32())
            .await?;

        let mut paused = 0;
        for campaign in running {
            if self.db.try_pause_campaign(CampaignId(campaign.id)).await? {
                paused += 1;
            }
        }

        if paused > 0 {
            tracing::info!(paused, "paused all running campaigns");
        }
        Ok(paused)
    }

    fn ensure_accepting(&self) -> Result<()> {
        if self
            .workers
            .accepting_new
            .load(std::sync::atomic::Ordering::SeqCst)
        {
            Ok(())
        } else {
            Err(Error::ShuttingDown)
        }
    }
}
