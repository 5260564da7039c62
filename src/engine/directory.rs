//! Recipient directory seam.

use crate::db::Database;
use crate::error::Result;
use crate::types::{ChannelType, Recipient};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for resolving a campaign's recipient sequence
///
/// The sequence is ordered, finite, and produced fresh on every dispatch
/// loop entry (initial start and every resume) — the engine never caches it
/// across suspensions. Implementations are expected to pre-filter by channel
/// type and active flag.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// Resolve the ordered recipient sequence for one owner and channel
    ///
    /// # Errors
    ///
    /// A directory failure is a setup error: the campaign run is marked
    /// failed without attempting any recipient.
    async fn recipients(&self, user_id: i64, channel: ChannelType) -> Result<Vec<Recipient>>;
}

/// SQLite-backed directory over the engine's own `contacts` table
///
/// Rows come back ordered by insertion id, so the sequence is stable across
/// a pause/resume cycle as long as the table is not edited in between.
#[derive(Debug, Clone)]
pub struct ContactDirectory {
    db: Arc<Database>,
}

impl ContactDirectory {
    /// Create a directory reading from the given database
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecipientDirectory for ContactDirectory {
    async fn recipients(&self, user_id: i64, channel: ChannelType) -> Result<Vec<Recipient>> {
        let contacts = self.db.list_active_contacts(user_id, channel.to_i32()).await?;
        Ok(contacts
            .into_iter()
            .map(|c| Recipient {
                identifier: c.identifier,
                first_name: c.first_name,
                last_name: c.last_name,
            })
            .collect())
    }
}
