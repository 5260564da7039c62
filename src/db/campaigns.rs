//! Campaign CRUD, atomic status transitions, and counter checkpoints.
//!
//! Status transitions that admit a campaign into an active state are
//! compare-and-swap UPDATEs conditioned on the expected source status. The
//! single-flight guarantee rests on these: two concurrent `Start` calls race
//! on the same `Draft -> Running` CAS and exactly one wins.

use crate::error::DatabaseError;
use crate::types::{CampaignId, CampaignStatus};
use crate::{Error, Result};

use super::{Campaign, Database, NewCampaign};

/// Shared column list for campaign SELECTs
const CAMPAIGN_COLUMNS: &str = r#"
    id, user_id, name, channel, sender_id, subject, message, status,
    batch_size, delay_seconds, retry_failed, total_contacts, sent_count,
    failed_count, error_message, created_at, started_at, completed_at
"#;

impl Database {
    /// Insert a new campaign record in `Draft` status
    pub async fn insert_campaign(&self, campaign: &NewCampaign) -> Result<CampaignId> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO campaigns (
                user_id, name, channel, sender_id, subject, message,
                status, batch_size, delay_seconds, retry_failed,
                total_contacts, sent_count, failed_count, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(campaign.user_id)
        .bind(&campaign.name)
        .bind(campaign.channel)
        .bind(campaign.sender_id)
        .bind(&campaign.subject)
        .bind(&campaign.message)
        .bind(CampaignStatus::Draft.to_i32())
        .bind(campaign.batch_size)
        .bind(campaign.delay_seconds)
        .bind(campaign.retry_failed)
        .bind(0i64) // total_contacts
        .bind(0i64) // sent_count
        .bind(0i64) // failed_count
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert campaign: {}",
                e
            )))
        })?;

        Ok(CampaignId(result.last_insert_rowid()))
    }

    /// Get a campaign by ID
    pub async fn get_campaign(&self, id: CampaignId) -> Result<Option<Campaign>> {
        let row = sqlx::query_as::<_, Campaign>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get campaign: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Get only the current status of a campaign
    ///
    /// This is the per-batch poll the dispatch loop issues, kept narrow so
    /// the status re-check stays cheap.
    pub async fn get_campaign_status(&self, id: CampaignId) -> Result<Option<CampaignStatus>> {
        let status: Option<i32> = sqlx::query_scalar("SELECT status FROM campaigns WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to get campaign status: {}",
                    e
                )))
            })?;

        Ok(status.map(CampaignStatus::from_i32))
    }

    /// List campaigns with a specific status
    pub async fn list_campaigns_by_status(&self, status: i32) -> Result<Vec<Campaign>> {
        let rows = sqlx::query_as::<_, Campaign>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE status = ? ORDER BY created_at ASC"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list campaigns by status: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Atomically transition `Draft -> Running` and stamp `started_at`
    ///
    /// Returns true if this caller won the transition. A false return means
    /// the campaign was not in `Draft` (missing, already started, or
    /// terminal) and the caller must not dispatch.
    pub async fn try_start_campaign(&self, id: CampaignId) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            "UPDATE campaigns SET status = ?, started_at = ? WHERE id = ? AND status = ?",
        )
        .bind(CampaignStatus::Running.to_i32())
        .bind(now)
        .bind(id)
        .bind(CampaignStatus::Draft.to_i32())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to start campaign: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() == 1)
    }

    /// Atomically transition `Paused -> Running`
    ///
    /// Returns true if this caller won the transition.
    pub async fn try_resume_campaign(&self, id: CampaignId) -> Result<bool> {
        let result = sqlx::query("UPDATE campaigns SET status = ? WHERE id = ? AND status = ?")
            .bind(CampaignStatus::Running.to_i32())
            .bind(id)
            .bind(CampaignStatus::Paused.to_i32())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to resume campaign: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected() == 1)
    }

    /// Atomically transition `Running -> Paused`
    ///
    /// Returns true if the transition applied (false when the campaign was
    /// not `Running`; the caller decides whether that is idempotent success
    /// or an invalid-state error).
    pub async fn try_pause_campaign(&self, id: CampaignId) -> Result<bool> {
        let result = sqlx::query("UPDATE campaigns SET status = ? WHERE id = ? AND status = ?")
            .bind(CampaignStatus::Paused.to_i32())
            .bind(id)
            .bind(CampaignStatus::Running.to_i32())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to pause campaign: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected() == 1)
    }

    /// Atomically transition `Running|Paused -> Completed` (operator stop)
    ///
    /// Stamps `completed_at` only if it was not already set. Returns true if
    /// the transition applied.
    pub async fn try_stop_campaign(&self, id: CampaignId) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            UPDATE campaigns
            SET status = ?, completed_at = COALESCE(completed_at, ?)
            WHERE id = ? AND status IN (?, ?)
            "#,
        )
        .bind(CampaignStatus::Completed.to_i32())
        .bind(now)
        .bind(id)
        .bind(CampaignStatus::Running.to_i32())
        .bind(CampaignStatus::Paused.to_i32())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to stop campaign: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() == 1)
    }

    /// Atomically transition `Running|Paused -> Failed`, recording the error
    ///
    /// Same guard as [`Self::try_stop_campaign`]: a campaign that already
    /// reached a terminal status stays where it is, and the error message is
    /// only written when the transition applies. Returns true if this caller
    /// won the transition.
    pub async fn try_fail_campaign(&self, id: CampaignId, error: &str) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            UPDATE campaigns
            SET status = ?, error_message = ?, completed_at = COALESCE(completed_at, ?)
            WHERE id = ? AND status IN (?, ?)
            "#,
        )
        .bind(CampaignStatus::Failed.to_i32())
        .bind(error)
        .bind(now)
        .bind(id)
        .bind(CampaignStatus::Running.to_i32())
        .bind(CampaignStatus::Paused.to_i32())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to mark campaign failed: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() == 1)
    }

    /// Update campaign status without touching timestamps
    pub async fn update_campaign_status(&self, id: CampaignId, status: i32) -> Result<()> {
        sqlx::query("UPDATE campaigns SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to update campaign status: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Checkpoint the running counters after a batch
    pub async fn checkpoint_counts(
        &self,
        id: CampaignId,
        sent_count: i64,
        failed_count: i64,
    ) -> Result<()> {
        sqlx::query("UPDATE campaigns SET sent_count = ?, failed_count = ? WHERE id = ?")
            .bind(sent_count)
            .bind(failed_count)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to checkpoint counts: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Set the resolved recipient total for the current run
    pub async fn set_total_contacts(&self, id: CampaignId, total: i64) -> Result<()> {
        sqlx::query("UPDATE campaigns SET total_contacts = ? WHERE id = ?")
            .bind(total)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to set total contacts: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Demote campaigns stranded in `Running` by a crash back to `Paused`
    ///
    /// Called on startup after an unclean shutdown so interrupted runs can
    /// be resumed explicitly. Returns the number of campaigns demoted.
    pub async fn demote_stranded_running(&self) -> Result<u64> {
        let result = sqlx::query("UPDATE campaigns SET status = ? WHERE status = ?")
            .bind(CampaignStatus::Paused.to_i32())
            .bind(CampaignStatus::Running.to_i32())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to demote stranded campaigns: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected())
    }
}
