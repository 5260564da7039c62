//! Contact records backing the SQLite recipient directory.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{Contact, Database, NewContact};

impl Database {
    /// Insert a new contact record
    pub async fn insert_contact(&self, contact: &NewContact) -> Result<i64> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO contacts (user_id, identifier, channel, first_name, last_name, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, 1, ?)
            "#,
        )
        .bind(contact.user_id)
        .bind(&contact.identifier)
        .bind(contact.channel)
        .bind(&contact.first_name)
        .bind(&contact.last_name)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert contact: {}",
                e
            )))
        })?;

        Ok(result.last_insert_rowid())
    }

    /// List active contacts for a user on a channel, in insertion order
    ///
    /// This is the recipient query behind
    /// [`ContactDirectory`](crate::engine::ContactDirectory): pre-filtered
    /// by channel type and active flag, stable order.
    pub async fn list_active_contacts(&self, user_id: i64, channel: i32) -> Result<Vec<Contact>> {
        let rows = sqlx::query_as::<_, Contact>(
            r#"
            SELECT id, user_id, identifier, channel, first_name, last_name, is_active, created_at
            FROM contacts
            WHERE user_id = ? AND channel = ? AND is_active = 1
            ORDER BY id ASC
            "#,
        )
        .bind(user_id)
        .bind(channel)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list active contacts: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Activate or deactivate a contact
    pub async fn set_contact_active(&self, id: i64, is_active: bool) -> Result<()> {
        sqlx::query("UPDATE contacts SET is_active = ? WHERE id = ?")
            .bind(is_active)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to set contact active flag: {}",
                    e
                )))
            })?;

        Ok(())
    }
}
