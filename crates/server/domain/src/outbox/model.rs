//! Outbox Event Record Model
//!
//! Domain model for event records used in the Transactional Outbox Pattern.

use crate::outbox::EventContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error types for outbox persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Infrastructure error: {message}")]
    Infrastructure { message: String },
}

/// An event as the producer describes it, before the environment tag is
/// stamped on.
///
/// Producers build drafts; the appender turns them into [`EventRecordInsert`]
/// rows carrying the configured environment.
#[derive(Debug, Clone)]
pub struct EventRecordDraft {
    pub event_type: String,
    pub event_date_time: DateTime<Utc>,
    pub event_context: EventContext,
    pub metadata_version: i64,
}

impl EventRecordDraft {
    /// Create a draft dated now with the default metadata version.
    pub fn new(event_type: impl Into<String>, event_context: EventContext) -> Self {
        Self {
            event_type: event_type.into(),
            event_date_time: Utc::now(),
            event_context,
            metadata_version: 1,
        }
    }

    /// Override the occurrence timestamp (producer-supplied, not insertion time).
    pub fn with_date_time(mut self, event_date_time: DateTime<Utc>) -> Self {
        self.event_date_time = event_date_time;
        self
    }

    pub fn with_metadata_version(mut self, metadata_version: i64) -> Self {
        self.metadata_version = metadata_version;
        self
    }

    pub fn into_insert(self, environment: &str) -> EventRecordInsert {
        EventRecordInsert {
            event_type: self.event_type,
            event_date_time: self.event_date_time,
            environment: environment.to_string(),
            event_context: self.event_context,
            metadata_version: self.metadata_version,
        }
    }
}

/// An event record ready to be inserted into the outbox table.
#[derive(Debug, Clone)]
pub struct EventRecordInsert {
    pub event_type: String,
    pub event_date_time: DateTime<Utc>,
    pub environment: String,
    pub event_context: EventContext,
    pub metadata_version: i64,
}

/// A view of an event record read back from the outbox table.
///
/// `event_context` is kept as the raw stored JSON here; converting it back
/// into a typed [`EventContext`] is the relay's transform step and can fail
/// per record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecordView {
    pub id: i64,
    pub event_type: String,
    pub event_date_time: DateTime<Utc>,
    pub environment: String,
    pub event_context: serde_json::Value,
    pub metadata_version: i64,
    pub processed: bool,
}

impl EventRecordView {
    /// Check if the record still awaits relay.
    pub fn is_pending(&self) -> bool {
        !self.processed
    }

    /// Get the age of the record relative to its occurrence time.
    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.event_date_time)
    }
}

/// Counts by processing state, for monitoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxStats {
    pub pending_count: u64,
    pub processed_count: u64,
    pub oldest_pending_age_seconds: Option<i64>,
}

impl OutboxStats {
    pub fn total(&self) -> u64 {
        self.pending_count + self.processed_count
    }
}
