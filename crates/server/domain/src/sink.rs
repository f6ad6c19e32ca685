//! Event log sink abstraction.
//!
//! The analytical store is reached through this trait only; the relay does
//! not know the wire format beyond the insert contract. A sink call either
//! accepts the whole batch or fails it, there is no partial-row status.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    /// Connection or transport failure; the remote store never saw the
    /// batch, or its outcome is unknown.
    #[error("Sink unavailable: {0}")]
    Unavailable(String),

    /// The remote store parsed the request and refused it. Whole-cycle
    /// retry applies; persistent rejection needs manual intervention.
    #[error("Sink rejected batch: {0}")]
    Rejected(String),
}

/// One row in the sink's insert shape.
///
/// `event_context` is the canonical JSON string encoding of the record's
/// payload mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct EventLogRow {
    pub event_type: String,
    pub event_date_time: DateTime<Utc>,
    pub environment: String,
    pub event_context: String,
    pub metadata_version: i64,
}

/// Client for the analytical event log.
///
/// No internal retry: retry is applied by the relay at whole-cycle
/// granularity.
#[async_trait]
pub trait EventLogSink: Send + Sync {
    /// Insert an ordered batch of rows. All-or-nothing from the caller's
    /// point of view.
    async fn insert(&self, rows: &[EventLogRow]) -> Result<(), SinkError>;
}
