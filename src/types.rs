//! Core types for bulksend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a campaign
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CampaignId(pub i64);

impl CampaignId {
    /// Create a new CampaignId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for CampaignId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<CampaignId> for i64 {
    fn from(id: CampaignId) -> Self {
        id.0
    }
}

impl PartialEq<i64> for CampaignId {
    fn eq(&self, other: &i64) -> bool {
        self.0 == *other
    }
}

impl PartialEq<CampaignId> for i64 {
    fn eq(&self, other: &CampaignId) -> bool {
        *self == other.0
    }
}

impl std::fmt::Display for CampaignId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CampaignId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

// Implement sqlx Type, Encode, and Decode for database operations
impl sqlx::Type<sqlx::Sqlite> for CampaignId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for CampaignId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for CampaignId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// Campaign lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    /// Created but not yet started
    Draft,
    /// A dispatch worker is processing recipients
    Running,
    /// Suspended by the operator; resumable
    Paused,
    /// Finished (naturally or stopped early by the operator)
    Completed,
    /// Aborted by a setup or persistence error
    Failed,
}

impl CampaignStatus {
    /// Convert integer status code to CampaignStatus enum
    pub fn from_i32(status: i32) -> Self {
        match status {
            0 => CampaignStatus::Draft,
            1 => CampaignStatus::Running,
            2 => CampaignStatus::Paused,
            3 => CampaignStatus::Completed,
            4 => CampaignStatus::Failed,
            _ => CampaignStatus::Failed, // Default to Failed for unknown status
        }
    }

    /// Convert CampaignStatus enum to integer status code
    pub fn to_i32(&self) -> i32 {
        match self {
            CampaignStatus::Draft => 0,
            CampaignStatus::Running => 1,
            CampaignStatus::Paused => 2,
            CampaignStatus::Completed => 3,
            CampaignStatus::Failed => 4,
        }
    }

    /// Whether this status is terminal (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, CampaignStatus::Completed | CampaignStatus::Failed)
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Running => "running",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Delivery channel for a campaign
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    /// Chat network (bot API, recipient = chat identifier)
    Chat,
    /// Email over SMTP (recipient = address, subject supported)
    Email,
    /// SMS-like HTTP API (recipient = phone number)
    Sms,
}

impl ChannelType {
    /// Convert integer channel code to ChannelType enum
    pub fn from_i32(channel: i32) -> Option<Self> {
        match channel {
            0 => Some(ChannelType::Chat),
            1 => Some(ChannelType::Email),
            2 => Some(ChannelType::Sms),
            _ => None,
        }
    }

    /// Convert ChannelType enum to integer channel code
    pub fn to_i32(&self) -> i32 {
        match self {
            ChannelType::Chat => 0,
            ChannelType::Email => 1,
            ChannelType::Sms => 2,
        }
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChannelType::Chat => "chat",
            ChannelType::Email => "email",
            ChannelType::Sms => "sms",
        };
        write!(f, "{s}")
    }
}

/// Per-attempt outcome recorded in a campaign log row
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    /// The adapter accepted the message
    Sent,
    /// The adapter rejected the message or the call errored/timed out
    Failed,
}

impl LogStatus {
    /// String form stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Sent => "sent",
            LogStatus::Failed => "failed",
        }
    }
}

/// One addressable target of a campaign.
///
/// Produced by a [`RecipientDirectory`](crate::engine::RecipientDirectory),
/// already filtered to the campaign's channel type and active flag. The
/// identifier format is channel-specific (chat id, email address, phone
/// number).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Channel-specific address
    pub identifier: String,
    /// First name for template substitution
    pub first_name: Option<String>,
    /// Last name for template substitution
    pub last_name: Option<String>,
}

impl Recipient {
    /// Convenience constructor for a recipient with no name fields
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            first_name: None,
            last_name: None,
        }
    }
}

/// Event emitted during campaign dispatch
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Dispatch worker started processing a campaign
    Started {
        /// Campaign ID
        id: CampaignId,
        /// Number of recipients resolved for this run
        total_contacts: i64,
    },

    /// A message was accepted by the channel adapter
    RecipientSent {
        /// Campaign ID
        id: CampaignId,
        /// Recipient identifier
        identifier: String,
    },

    /// A send attempt failed (campaign continues)
    RecipientFailed {
        /// Campaign ID
        id: CampaignId,
        /// Recipient identifier
        identifier: String,
        /// Captured error message
        error: String,
    },

    /// Running counters checkpointed after a batch
    BatchCheckpoint {
        /// Campaign ID
        id: CampaignId,
        /// Zero-based batch index just completed
        batch_index: usize,
        /// Messages sent so far in this run
        sent_count: i64,
        /// Messages failed so far in this run
        failed_count: i64,
    },

    /// Worker observed a Pause request at a batch boundary and exited
    Paused {
        /// Campaign ID
        id: CampaignId,
    },

    /// Campaign reached the Completed status
    Completed {
        /// Campaign ID
        id: CampaignId,
        /// Final sent count
        sent_count: i64,
        /// Final failed count
        failed_count: i64,
    },

    /// Campaign reached the Failed status
    Failed {
        /// Campaign ID
        id: CampaignId,
        /// Error that aborted the run
        error: String,
    },

    /// Graceful shutdown initiated
    Shutdown,
}

/// Terminal notification payload handed to the
/// [`NotificationSink`](crate::engine::NotificationSink) when a campaign
/// reaches a terminal status.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CampaignOutcome {
    /// Campaign ID
    pub campaign_id: CampaignId,
    /// Terminal status (`Completed` or `Failed`)
    pub final_status: CampaignStatus,
    /// Messages accepted by the adapter
    pub sent_count: i64,
    /// Messages that failed to send
    pub failed_count: i64,
    /// Recipients resolved for the run
    pub total_contacts: i64,
    /// When the outcome was produced (Unix timestamp in seconds)
    pub timestamp: i64,
}

/// Read-only view of a campaign's progress
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CampaignProgress {
    /// Campaign ID
    pub id: CampaignId,
    /// Current status
    pub status: CampaignStatus,
    /// Recipients resolved for the run
    pub total_contacts: i64,
    /// Messages accepted so far
    pub sent_count: i64,
    /// Messages failed so far
    pub failed_count: i64,
    /// When the campaign was created
    pub created_at: DateTime<Utc>,
    /// When dispatch started (None for drafts)
    pub started_at: Option<DateTime<Utc>>,
    /// When the campaign reached a terminal status
    pub completed_at: Option<DateTime<Utc>>,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    // --- CampaignStatus integer encoding ---

    #[test]
    fn status_round_trips_through_i32_for_all_variants() {
        let cases = [
            (CampaignStatus::Draft, 0),
            (CampaignStatus::Running, 1),
            (CampaignStatus::Paused, 2),
            (CampaignStatus::Completed, 3),
            (CampaignStatus::Failed, 4),
        ];

        for (variant, expected_int) in cases {
            assert_eq!(
                variant.to_i32(),
                expected_int,
                "{variant:?} should encode to {expected_int}"
            );
            assert_eq!(
                CampaignStatus::from_i32(expected_int),
                variant,
                "{expected_int} should decode to {variant:?}"
            );
        }
    }

    #[test]
    fn status_from_unknown_integer_defaults_to_failed() {
        assert_eq!(
            CampaignStatus::from_i32(99),
            CampaignStatus::Failed,
            "unknown status 99 must fall back to Failed so corrupted DB rows surface visibly"
        );
        assert_eq!(
            CampaignStatus::from_i32(-1),
            CampaignStatus::Failed,
            "negative status must fall back to Failed, not silently become Draft"
        );
    }

    #[test]
    fn only_completed_and_failed_are_terminal() {
        assert!(CampaignStatus::Completed.is_terminal());
        assert!(CampaignStatus::Failed.is_terminal());
        assert!(!CampaignStatus::Draft.is_terminal());
        assert!(!CampaignStatus::Running.is_terminal());
        assert!(!CampaignStatus::Paused.is_terminal());
    }

    // --- ChannelType integer encoding ---

    #[test]
    fn channel_round_trips_through_i32_for_all_variants() {
        let cases = [
            (ChannelType::Chat, 0),
            (ChannelType::Email, 1),
            (ChannelType::Sms, 2),
        ];

        for (variant, expected_int) in cases {
            assert_eq!(variant.to_i32(), expected_int);
            assert_eq!(ChannelType::from_i32(expected_int), Some(variant));
        }
    }

    #[test]
    fn channel_from_unknown_integer_is_none() {
        assert_eq!(
            ChannelType::from_i32(42),
            None,
            "unknown channel codes must be rejected, not coerced to a real channel"
        );
    }

    // --- CampaignId conversions ---

    #[test]
    fn campaign_id_from_i64_and_back() {
        let id = CampaignId::from(42_i64);
        let raw: i64 = id.into();
        assert_eq!(raw, 42);
    }

    #[test]
    fn campaign_id_from_str_parses_valid_integer() {
        let id = CampaignId::from_str("123").unwrap();
        assert_eq!(id.get(), 123);
    }

    #[test]
    fn campaign_id_from_str_rejects_non_numeric() {
        assert!(CampaignId::from_str("abc").is_err());
        assert!(CampaignId::from_str("").is_err());
        assert!(CampaignId::from_str("3.14").is_err());
    }

    #[test]
    fn campaign_id_display_matches_inner_value() {
        assert_eq!(CampaignId::new(999).to_string(), "999");
    }

    #[test]
    fn campaign_id_partial_eq_with_i64() {
        let id = CampaignId::new(10);
        assert!(id == 10_i64);
        assert!(10_i64 == id);
        assert!(id != 11_i64);
    }
}
