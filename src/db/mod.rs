//! Database layer for bulksend
//!
//! Handles SQLite persistence for campaigns, campaign logs, senders, and
//! contacts.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`campaigns`] — Campaign CRUD, atomic status transitions, checkpoints
//! - [`logs`] — Append-only per-attempt outcome rows, retention cleanup
//! - [`senders`] — Sender credential records
//! - [`contacts`] — Contact records backing the SQLite recipient directory
//! - [`state`] — Runtime state (clean-shutdown tracking)

use crate::types::CampaignId;
use sqlx::{FromRow, sqlite::SqlitePool};

mod campaigns;
mod contacts;
mod logs;
mod migrations;
mod senders;
mod state;


/// Database handle for the engine's SQLite store
#[derive(Debug, Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

/// New campaign to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewCampaign {
    /// Owning user ID
    pub user_id: i64,
    /// Display name for this campaign
    pub name: String,
    /// Channel code (see [`crate::types::ChannelType`])
    pub channel: i32,
    /// Sender record to dispatch through
    pub sender_id: Option<i64>,
    /// Optional subject (used only by channels that have one)
    pub subject: Option<String>,
    /// Message template
    pub message: String,
    /// Recipients per batch (must be positive)
    pub batch_size: i64,
    /// Delay between messages in seconds (non-negative)
    pub delay_seconds: i64,
    /// Advisory flag: operator intends to retry failed recipients manually
    pub retry_failed: bool,
}

/// Campaign record from database
#[derive(Debug, Clone, FromRow)]
pub struct Campaign {
    /// Unique database ID
    pub id: i64,
    /// Owning user ID
    pub user_id: i64,
    /// Display name for this campaign
    pub name: String,
    /// Channel code (see [`crate::types::ChannelType`])
    pub channel: i32,
    /// Sender record to dispatch through
    pub sender_id: Option<i64>,
    /// Optional subject (used only by channels that have one)
    pub subject: Option<String>,
    /// Message template
    pub message: String,
    /// Current status code (see [`crate::types::CampaignStatus`])
    pub status: i32,
    /// Recipients per batch
    pub batch_size: i64,
    /// Delay between messages in seconds
    pub delay_seconds: i64,
    /// Advisory retry-failed flag
    pub retry_failed: bool,
    /// Recipients resolved for the current/last run
    pub total_contacts: i64,
    /// Messages accepted by the adapter so far
    pub sent_count: i64,
    /// Messages that failed to send so far
    pub failed_count: i64,
    /// Error message if the run failed
    pub error_message: Option<String>,
    /// Unix timestamp when the campaign was created
    pub created_at: i64,
    /// Unix timestamp when dispatch first started
    pub started_at: Option<i64>,
    /// Unix timestamp when the campaign reached a terminal status
    pub completed_at: Option<i64>,
}

/// New campaign log row to be appended
#[derive(Debug, Clone)]
pub struct NewCampaignLog {
    /// Campaign this attempt belongs to
    pub campaign_id: CampaignId,
    /// Recipient identifier the send was addressed to
    pub recipient: String,
    /// Outcome string ("sent" or "failed")
    pub status: String,
    /// Captured error message for failed attempts
    pub error_message: Option<String>,
}

/// Campaign log record from database (append-only, never mutated)
#[derive(Debug, Clone, FromRow)]
pub struct CampaignLog {
    /// Unique database ID
    pub id: i64,
    /// Campaign this attempt belongs to
    pub campaign_id: i64,
    /// Recipient identifier the send was addressed to
    pub recipient: String,
    /// Outcome string ("sent" or "failed")
    pub status: String,
    /// Captured error message for failed attempts
    pub error_message: Option<String>,
    /// Unix timestamp of the attempt
    pub sent_at: i64,
}

/// New sender to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewSender {
    /// Owning user ID
    pub user_id: i64,
    /// Display name
    pub name: String,
    /// Channel code this sender serves
    pub channel: i32,
    /// Opaque credential blob, passed unmodified to the adapter constructor
    pub config: serde_json::Value,
    /// Whether this sender may be used
    pub is_active: bool,
}

/// Sender record from database
#[derive(Debug, Clone, FromRow)]
pub struct Sender {
    /// Unique database ID
    pub id: i64,
    /// Owning user ID
    pub user_id: i64,
    /// Display name
    pub name: String,
    /// Channel code this sender serves
    pub channel: i32,
    /// Opaque credential blob (JSON text)
    pub config: String,
    /// Whether this sender may be used
    pub is_active: bool,
    /// Unix timestamp of the last successful campaign start
    pub last_used: Option<i64>,
    /// Unix timestamp when the sender was created
    pub created_at: i64,
}

/// New contact to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewContact {
    /// Owning user ID
    pub user_id: i64,
    /// Channel-specific address
    pub identifier: String,
    /// Channel code this contact is addressable on
    pub channel: i32,
    /// First name for template substitution
    pub first_name: Option<String>,
    /// Last name for template substitution
    pub last_name: Option<String>,
}

/// Contact record from database
#[derive(Debug, Clone, FromRow)]
pub struct Contact {
    /// Unique database ID
    pub id: i64,
    /// Owning user ID
    pub user_id: i64,
    /// Channel-specific address
    pub identifier: String,
    /// Channel code this contact is addressable on
    pub channel: i32,
    /// First name for template substitution
    pub first_name: Option<String>,
    /// Last name for template substitution
    pub last_name: Option<String>,
    /// Whether this contact is eligible for campaigns
    pub is_active: bool,
    /// Unix timestamp when the contact was created
    pub created_at: i64,
}
