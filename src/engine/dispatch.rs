//! The per-campaign dispatch worker: setup, batch loop, finalization.

use crate::adapters::ChannelAdapter;
use crate::db::{Campaign, NewCampaignLog};
use crate::error::{DispatchError, Error, Result, SendError};
use crate::retry::persist_with_retry;
use crate::templater;
use crate::types::{CampaignId, CampaignStatus, ChannelType, Event, LogStatus, Recipient};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::CampaignEngine;

/// Why the batch loop stopped before reaching the end of the sequence
enum LoopExit {
    /// All recipients processed
    Finished,
    /// Pause observed at a batch boundary; status left untouched
    Paused,
    /// Stop (or some other external transition) observed; nothing left to do
    Superseded,
    /// Shutdown cancellation observed; campaign parked as Paused
    Shutdown,
}

impl CampaignEngine {
    /// Spawn the worker task for a campaign whose status CAS already succeeded
    ///
    /// The worker owns the campaign until it exits: it is registered in the
    /// active map (for shutdown signaling) and deregisters itself on the way
    /// out. Any error escaping the run marks the campaign failed.
    pub(crate) async fn spawn_worker(&self, id: CampaignId) {
        let token = CancellationToken::new();
        self.workers
            .active_campaigns
            .lock()
            .await
            .insert(id, token.clone());

        let engine = self.clone();
        tokio::spawn(async move {
            if let Err(e) = engine.run_campaign(id, &token).await {
                tracing::error!(campaign_id = id.0, error = %e, "campaign run aborted");
                engine.fail_campaign(id, &e.to_string()).await;
            }
            engine.workers.active_campaigns.lock().await.remove(&id);
        });
    }

    /// Execute one campaign run from setup through finalization
    ///
    /// Setup errors (bad channel code, missing/inactive sender, failed
    /// connect probe, directory failure) bubble up as `Err` and the caller
    /// marks the campaign failed. Per-recipient send failures never do.
    async fn run_campaign(&self, id: CampaignId, token: &CancellationToken) -> Result<()> {
        let campaign = self
            .db
            .get_campaign(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("campaign {id}")))?;

        let channel = ChannelType::from_i32(campaign.channel).ok_or(
            DispatchError::UnknownChannelCode {
                id: id.0,
                code: campaign.channel,
            },
        )?;

        let adapter = self.resolve_adapter(&campaign, channel).await?;

        // Fresh sequence on every loop entry (initial start and resume alike)
        let recipients = self.directory.recipients(campaign.user_id, channel).await?;

        // Resume cursor: skip what previous entries already processed
        let processed = (campaign.sent_count + campaign.failed_count).max(0) as usize;
        let total = recipients.len().max(processed) as i64;
        persist_with_retry(&self.config.persistence.retry, || {
            self.db.set_total_contacts(id, total)
        })
        .await?;

        if recipients.len() <= processed {
            // Zero eligible recipients is completion, not an error
            tracing::info!(campaign_id = id.0, total_contacts = total, "nothing to dispatch");
            self.complete_campaign(id).await?;
            return Ok(());
        }

        self.emit_event(Event::Started {
            id,
            total_contacts: total,
        });
        tracing::info!(
            campaign_id = id.0,
            channel = %channel,
            total_contacts = total,
            resume_offset = processed,
            "campaign dispatch started"
        );

        let exit = self
            .batch_loop(&campaign, &recipients[processed..], adapter.as_ref(), token)
            .await?;

        match exit {
            LoopExit::Finished => {
                // Stop may have landed during the final batch; only finalize
                // if the campaign is still ours
                match self.db.get_campaign_status(id).await? {
                    Some(CampaignStatus::Running) => self.complete_campaign(id).await?,
                    _ => tracing::debug!(campaign_id = id.0, "run finished but status changed"),
                }
            }
            LoopExit::Paused => {
                self.emit_event(Event::Paused { id });
                tracing::info!(campaign_id = id.0, "campaign paused at batch boundary");
            }
            LoopExit::Superseded => {
                tracing::debug!(campaign_id = id.0, "campaign taken over externally; worker exiting");
            }
            LoopExit::Shutdown => {
                // Park as Paused so the campaign can be resumed after restart
                if self.db.try_pause_campaign(id).await? {
                    self.emit_event(Event::Paused { id });
                }
                tracing::info!(campaign_id = id.0, "campaign parked for shutdown");
            }
        }

        Ok(())
    }

    /// Resolve and probe the channel adapter for a campaign
    async fn resolve_adapter(
        &self,
        campaign: &Campaign,
        channel: ChannelType,
    ) -> Result<Arc<dyn ChannelAdapter>> {
        let sender_id = campaign.sender_id.ok_or(DispatchError::SenderUnavailable {
            campaign_id: campaign.id,
            reason: "no sender configured".to_string(),
        })?;

        let sender = self
            .db
            .get_sender(sender_id)
            .await?
            .ok_or(DispatchError::SenderUnavailable {
                campaign_id: campaign.id,
                reason: format!("sender {sender_id} not found"),
            })?;

        if !sender.is_active {
            return Err(DispatchError::SenderUnavailable {
                campaign_id: campaign.id,
                reason: format!("sender {sender_id} is inactive"),
            }
            .into());
        }

        if !self.adapters.supports(channel) {
            return Err(DispatchError::UnsupportedChannel {
                channel: channel.to_string(),
            }
            .into());
        }

        let config: serde_json::Value = serde_json::from_str(&sender.config)?;
        let adapter = self.adapters.build(channel, &config)?;

        // Fail fast before touching any recipient
        adapter.connect().await?;
        self.db.touch_sender(sender_id).await?;

        Ok(adapter)
    }

    /// Process the remaining recipients in batches
    ///
    /// Counters start from the campaign's persisted values so a resumed run
    /// keeps accumulating rather than restarting from zero.
    async fn batch_loop(
        &self,
        campaign: &Campaign,
        remaining: &[Recipient],
        adapter: &dyn ChannelAdapter,
        token: &CancellationToken,
    ) -> Result<LoopExit> {
        let id = CampaignId(campaign.id);
        let batch_size = if campaign.batch_size > 0 {
            campaign.batch_size as usize
        } else {
            self.config.dispatch.default_batch_size
        };
        let delay = std::time::Duration::from_secs(campaign.delay_seconds.max(0) as u64);
        // Channels that carry a subject fall back to the campaign name
        let subject = Some(campaign.subject.as_deref().unwrap_or(&campaign.name));

        let mut sent = campaign.sent_count;
        let mut failed = campaign.failed_count;
        let batch_count = remaining.chunks(batch_size).len();

        for (batch_index, batch) in remaining.chunks(batch_size).enumerate() {
            // Cooperative checkpoints: shutdown token first, then the
            // persisted status as the sole pause/stop signal
            if token.is_cancelled() {
                return Ok(LoopExit::Shutdown);
            }
            match self.db.get_campaign_status(id).await? {
                Some(CampaignStatus::Running) => {}
                Some(CampaignStatus::Paused) => return Ok(LoopExit::Paused),
                _ => return Ok(LoopExit::Superseded),
            }

            for (i, recipient) in batch.iter().enumerate() {
                let text = templater::render_for(&campaign.message, recipient);

                let outcome = match tokio::time::timeout(
                    self.config.dispatch.send_timeout,
                    adapter.send(&recipient.identifier, &text, subject),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(SendError::Timeout {
                        seconds: self.config.dispatch.send_timeout.as_secs(),
                    }),
                };

                let log = match outcome {
                    Ok(()) => {
                        sent += 1;
                        self.emit_event(Event::RecipientSent {
                            id,
                            identifier: recipient.identifier.clone(),
                        });
                        NewCampaignLog {
                            campaign_id: id,
                            recipient: recipient.identifier.clone(),
                            status: LogStatus::Sent.as_str().to_string(),
                            error_message: None,
                        }
                    }
                    Err(e) => {
                        failed += 1;
                        tracing::warn!(
                            campaign_id = id.0,
                            recipient = %recipient.identifier,
                            error = %e,
                            "send attempt failed"
                        );
                        self.emit_event(Event::RecipientFailed {
                            id,
                            identifier: recipient.identifier.clone(),
                            error: e.to_string(),
                        });
                        NewCampaignLog {
                            campaign_id: id,
                            recipient: recipient.identifier.clone(),
                            status: LogStatus::Failed.as_str().to_string(),
                            error_message: Some(e.to_string()),
                        }
                    }
                };

                persist_with_retry(&self.config.persistence.retry, || self.db.append_log(&log))
                    .await?;

                // Inter-message politeness delay, skipped after the batch's
                // last recipient (the inter-batch cooldown covers that)
                if i + 1 < batch.len() {
                    self.sleep_cancellable(delay, token).await;
                }
            }

            // Crash-safe checkpoint after every batch
            persist_with_retry(&self.config.persistence.retry, || {
                self.db.checkpoint_counts(id, sent, failed)
            })
            .await?;
            self.emit_event(Event::BatchCheckpoint {
                id,
                batch_index,
                sent_count: sent,
                failed_count: failed,
            });
            tracing::debug!(
                campaign_id = id.0,
                batch_index,
                sent_count = sent,
                failed_count = failed,
                "batch checkpoint"
            );

            if batch_index + 1 < batch_count {
                self.sleep_cancellable(delay * 2, token).await;
            }
        }

        Ok(LoopExit::Finished)
    }

    /// Sleep that returns early when shutdown is signaled
    async fn sleep_cancellable(&self, duration: std::time::Duration, token: &CancellationToken) {
        if duration.is_zero() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = token.cancelled() => {}
        }
    }

    /// Transition a campaign to Completed and notify
    ///
    /// Uses the same CAS as the stop verb, so if an operator stop lands
    /// concurrently exactly one of the two paths finalizes and notifies.
    pub(crate) async fn complete_campaign(&self, id: CampaignId) -> Result<()> {
        let won = persist_with_retry(&self.config.persistence.retry, || {
            self.db.try_stop_campaign(id)
        })
        .await?;
        if !won {
            tracing::debug!(campaign_id = id.0, "campaign already finalized elsewhere");
            return Ok(());
        }

        let campaign = self
            .db
            .get_campaign(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("campaign {id}")))?;

        self.emit_event(Event::Completed {
            id,
            sent_count: campaign.sent_count,
            failed_count: campaign.failed_count,
        });
        tracing::info!(
            campaign_id = id.0,
            sent_count = campaign.sent_count,
            failed_count = campaign.failed_count,
            "campaign completed"
        );

        self.notify_terminal(&campaign, CampaignStatus::Completed).await;
        Ok(())
    }

    /// Transition a campaign to Failed, record the error, and notify
    ///
    /// The transition is the same `Running|Paused` CAS the stop verb uses:
    /// if an operator stop already landed a terminal status while setup was
    /// still underway, the failure is dropped and no second notification
    /// goes out. Best-effort otherwise: this runs on the error path, so
    /// persistence failures here are logged rather than propagated.
    pub(crate) async fn fail_campaign(&self, id: CampaignId, error: &str) {
        let won = match self.db.try_fail_campaign(id, error).await {
            Ok(won) => won,
            Err(e) => {
                tracing::error!(campaign_id = id.0, error = %e, "failed to mark campaign failed");
                return;
            }
        };
        if !won {
            tracing::debug!(
                campaign_id = id.0,
                error,
                "campaign already finalized elsewhere; dropping failure"
            );
            return;
        }

        self.emit_event(Event::Failed {
            id,
            error: error.to_string(),
        });

        match self.db.get_campaign(id).await {
            Ok(Some(campaign)) => self.notify_terminal(&campaign, CampaignStatus::Failed).await,
            Ok(None) => {}
            Err(e) => {
                tracing::error!(campaign_id = id.0, error = %e, "failed to load campaign for notification");
            }
        }
    }

    /// Hand the terminal outcome to the notification sink (best-effort)
    pub(crate) async fn notify_terminal(&self, campaign: &Campaign, status: CampaignStatus) {
        let outcome = crate::types::CampaignOutcome {
            campaign_id: CampaignId(campaign.id),
            final_status: status,
            sent_count: campaign.sent_count,
            failed_count: campaign.failed_count,
            total_contacts: campaign.total_contacts,
            timestamp: chrono::Utc::now().timestamp(),
        };

        if let Err(e) = self.notifier.notify(&outcome).await {
            tracing::warn!(
                campaign_id = campaign.id,
                error = %e,
                "terminal notification failed"
            );
        }
    }
}
