//! Error types for bulksend
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (Dispatch, Database, adapter Connect/Send)
//! - A strict separation between per-recipient send failures (data, not
//!   errors — they are logged and counted) and run-level failures (errors
//!   that abort a campaign)

use thiserror::Error;

/// Result type alias for bulksend operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for bulksend
///
/// This is the primary error type used throughout the library. Each variant
/// includes contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "send_timeout")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Campaign dispatch error (lifecycle, setup, single-flight)
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// Channel adapter connection probe failed
    #[error("channel connect error: {0}")]
    Connect(#[from] ConnectError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Campaign or related record not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Shutdown in progress - not accepting new campaign starts
    #[error("shutdown in progress: not accepting new campaign starts")]
    ShuttingDown,

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Record not found
    #[error("record not found: {0}")]
    NotFound(String),

    /// Constraint violation (e.g., duplicate key)
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Campaign dispatch errors
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Cannot perform operation in current lifecycle state
    #[error("cannot {operation} campaign {id} in state {current_state}")]
    InvalidState {
        /// The campaign ID that is in an invalid state for the operation
        id: i64,
        /// The operation that was attempted (e.g., "start", "resume")
        operation: String,
        /// The current state that prevents the operation (e.g., "completed")
        current_state: String,
    },

    /// Another worker already holds the campaign (single-flight violation)
    #[error("campaign {id} is already being dispatched")]
    AlreadyActive {
        /// The campaign ID that already has an active worker
        id: i64,
    },

    /// The campaign's sender is missing or inactive
    #[error("sender unavailable for campaign {campaign_id}: {reason}")]
    SenderUnavailable {
        /// The campaign whose sender could not be resolved
        campaign_id: i64,
        /// Why the sender could not be used
        reason: String,
    },

    /// No adapter is registered for the campaign's channel
    #[error("no adapter registered for channel {channel}")]
    UnsupportedChannel {
        /// The channel name
        channel: String,
    },

    /// The stored channel code could not be decoded
    #[error("campaign {id} has unknown channel code {code}")]
    UnknownChannelCode {
        /// The campaign ID carrying the bad code
        id: i64,
        /// The raw integer code from the database
        code: i32,
    },
}

/// Channel adapter connection/probe errors
///
/// Returned by [`ChannelAdapter::connect`](crate::adapters::ChannelAdapter::connect).
/// A connect failure before the dispatch loop fails the campaign fast.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Credentials were rejected by the provider
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The provider could not be reached
    #[error("provider unreachable: {0}")]
    Unreachable(String),

    /// The sender configuration blob is missing or malformed
    #[error("invalid sender configuration: {0}")]
    Config(String),
}

/// Per-recipient send errors
///
/// Returned by [`ChannelAdapter::send`](crate::adapters::ChannelAdapter::send).
/// These never abort a run: the dispatch loop captures the message into a
/// campaign log row and continues with the next recipient.
#[derive(Debug, Error)]
pub enum SendError {
    /// The provider rejected the message
    #[error("rejected by provider: {0}")]
    Rejected(String),

    /// The recipient identifier is not valid for this channel
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    /// Transport-level failure talking to the provider
    #[error("transport error: {0}")]
    Transport(String),

    /// The bounded per-call timeout elapsed before the provider answered
    #[error("send timed out after {seconds}s")]
    Timeout {
        /// The configured timeout in seconds
        seconds: u64,
    },
}
