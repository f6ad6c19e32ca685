//! Appending event records to the outbox.

use eventline_domain::outbox::{EventRecordDraft, OutboxError, OutboxRepository};
use sqlx::PgTransaction;
use std::sync::Arc;
use tracing::debug;

/// Writes event records into the outbox table.
///
/// `append` runs inside the caller's transaction, so the record commits or
/// rolls back together with the business write that produced it. Bulk
/// backfills that carry no business write go through `append_many`, which
/// manages its own per-chunk transactions.
pub struct OutboxAppender {
    repository: Arc<dyn OutboxRepository>,
    environment: String,
}

impl OutboxAppender {
    pub fn new(repository: Arc<dyn OutboxRepository>, environment: impl Into<String>) -> Self {
        Self {
            repository,
            environment: environment.into(),
        }
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Append one record within the caller's open transaction.
    pub async fn append(
        &self,
        tx: &mut PgTransaction<'_>,
        draft: EventRecordDraft,
    ) -> Result<(), OutboxError> {
        let insert = draft.into_insert(&self.environment);
        debug!(event_type = %insert.event_type, "Appending outbox record");
        self.repository
            .append_with_tx(tx, std::slice::from_ref(&insert))
            .await
    }

    /// Append a large set of records in chunks, one transaction per chunk.
    ///
    /// Returns the number of records written. A chunk that fails stops the
    /// operation; earlier chunks stay committed.
    pub async fn append_many(
        &self,
        drafts: Vec<EventRecordDraft>,
        chunk_size: usize,
    ) -> Result<u64, OutboxError> {
        let inserts: Vec<_> = drafts
            .into_iter()
            .map(|d| d.into_insert(&self.environment))
            .collect();
        self.repository.append_chunked(&inserts, chunk_size).await
    }
}
