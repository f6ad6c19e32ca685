//! Outbox Repository Trait
//!
//! Abstraction for event record persistence. Append operations participate
//! in a caller-owned transaction so a record commits or rolls back together
//! with the business change that produced it.

use crate::outbox::{EventRecordInsert, EventRecordView, OutboxError, OutboxStats};
use async_trait::async_trait;
use sqlx::PgTransaction;

/// Repository for event record persistence.
///
/// Only the relay mutates `processed`; producers only insert. Records are
/// never deleted by this subsystem.
#[async_trait]
pub trait OutboxRepository: Send + Sync {
    /// Append records inside the caller's transaction.
    ///
    /// Must not open its own transaction boundary: if the enclosing
    /// transaction rolls back, the records do not exist afterwards.
    async fn append_with_tx(
        &self,
        tx: &mut PgTransaction<'_>,
        records: &[EventRecordInsert],
    ) -> Result<(), OutboxError>;

    /// Append a large input split into chunks of at most `chunk_size`, one
    /// insert-transaction per chunk.
    ///
    /// A failing chunk does not roll back previously committed chunks;
    /// at-least-once semantics carry through this path too.
    ///
    /// Returns the number of records inserted.
    async fn append_chunked(
        &self,
        records: &[EventRecordInsert],
        chunk_size: usize,
    ) -> Result<u64, OutboxError>;

    /// Select up to `limit` unprocessed records, oldest id first, locking
    /// the selected rows for the lifetime of `tx`.
    ///
    /// The returned set is frozen: records appended after the selection
    /// point are never part of this batch, and concurrent claims skip rows
    /// locked here, so overlapping cycles never work on the same ids.
    async fn claim_pending(
        &self,
        tx: &mut PgTransaction<'_>,
        limit: usize,
    ) -> Result<Vec<EventRecordView>, OutboxError>;

    /// Flip `processed` to true for exactly the given id set.
    ///
    /// Must only be called after the sink durably accepted the batch
    /// (insert-then-mark, never the reverse). Returns the number of rows
    /// updated.
    async fn mark_processed(
        &self,
        tx: &mut PgTransaction<'_>,
        ids: &[i64],
    ) -> Result<u64, OutboxError>;

    /// Count unprocessed records.
    async fn count_pending(&self) -> Result<u64, OutboxError>;

    /// Counts by processing state plus the age of the oldest pending record.
    async fn stats(&self) -> Result<OutboxStats, OutboxError>;
}
