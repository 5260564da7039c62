//! Sender credential records.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{Database, NewSender, Sender};

impl Database {
    /// Insert a new sender record
    pub async fn insert_sender(&self, sender: &NewSender) -> Result<i64> {
        let now = chrono::Utc::now().timestamp();
        let config = serde_json::to_string(&sender.config)?;

        let result = sqlx::query(
            r#"
            INSERT INTO senders (user_id, name, channel, config, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(sender.user_id)
        .bind(&sender.name)
        .bind(sender.channel)
        .bind(config)
        .bind(sender.is_active)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert sender: {}",
                e
            )))
        })?;

        Ok(result.last_insert_rowid())
    }

    /// Get a sender by ID
    pub async fn get_sender(&self, id: i64) -> Result<Option<Sender>> {
        let row = sqlx::query_as::<_, Sender>(
            r#"
            SELECT id, user_id, name, channel, config, is_active, last_used, created_at
            FROM senders
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get sender: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Stamp a sender's last_used timestamp
    pub async fn touch_sender(&self, id: i64) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query("UPDATE senders SET last_used = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to touch sender: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Activate or deactivate a sender
    pub async fn set_sender_active(&self, id: i64, is_active: bool) -> Result<()> {
        sqlx::query("UPDATE senders SET is_active = ? WHERE id = ?")
            .bind(is_active)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to set sender active flag: {}",
                    e
                )))
            })?;

        Ok(())
    }
}
