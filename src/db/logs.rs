//! Append-only campaign log rows and retention cleanup.
//!
//! One row per attempted send. Rows are never mutated or deleted by the
//! dispatch path; only the retention cleanup below removes aged rows.

use crate::error::DatabaseError;
use crate::types::CampaignId;
use crate::{Error, Result};

use super::{CampaignLog, Database, NewCampaignLog};

impl Database {
    /// Append a per-attempt outcome row
    pub async fn append_log(&self, log: &NewCampaignLog) -> Result<i64> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO campaign_logs (campaign_id, recipient, status, error_message, sent_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(log.campaign_id)
        .bind(&log.recipient)
        .bind(&log.status)
        .bind(&log.error_message)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to append campaign log: {}",
                e
            )))
        })?;

        Ok(result.last_insert_rowid())
    }

    /// List all log rows for a campaign in append order
    pub async fn list_logs(&self, campaign_id: CampaignId) -> Result<Vec<CampaignLog>> {
        let rows = sqlx::query_as::<_, CampaignLog>(
            r#"
            SELECT id, campaign_id, recipient, status, error_message, sent_at
            FROM campaign_logs
            WHERE campaign_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list campaign logs: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Count log rows for a campaign
    pub async fn count_logs(&self, campaign_id: CampaignId) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM campaign_logs WHERE campaign_id = ?")
                .bind(campaign_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to count campaign logs: {}",
                        e
                    )))
                })?;

        Ok(count)
    }

    /// Delete log rows older than the given number of days
    ///
    /// Retention cleanup, intended to be called by an external scheduler.
    /// Returns the number of rows deleted.
    pub async fn delete_logs_older_than(&self, days: i64) -> Result<u64> {
        let cutoff = chrono::Utc::now().timestamp() - days * 24 * 60 * 60;

        let result = sqlx::query("DELETE FROM campaign_logs WHERE sent_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete old campaign logs: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected())
    }
}
