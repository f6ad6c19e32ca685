//! Relay cycle implementation.
//!
//! One cycle claims a frozen batch of pending records under row locks,
//! transforms them into sink rows, submits the whole batch in a single
//! sink call, and marks exactly the claimed ids processed. The claim
//! transaction spans the cycle, so a failure anywhere before the final
//! commit releases the rows unmarked and the next cycle re-attempts them.

use crate::persistence::PostgresOutboxRepository;
use crate::relay::backoff::BackoffConfig;
use eventline_domain::outbox::{
    EventContext, EventRecordView, OutboxError, OutboxRepository, TransformError,
};
use eventline_domain::reporting::ErrorReporter;
use eventline_domain::sink::{EventLogRow, EventLogSink, SinkError};
use sqlx::postgres::PgPool;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, warn};

/// Configuration for the Outbox Relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Default number of records per cycle
    pub batch_size: usize,
    /// Bound on one cycle's in-flight sink call
    pub cycle_timeout: Duration,
    /// Whole-cycle retry strategy
    pub backoff: BackoffConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            cycle_timeout: Duration::from_secs(30),
            backoff: BackoffConfig::default(),
        }
    }
}

/// Error type for relay cycle operations.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Outbox error: {0}")]
    Outbox(#[from] OutboxError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("cycle timed out after {0:?} with the sink call in flight")]
    SinkTimeout(Duration),

    /// The sink accepted the batch but the processed flags did not commit.
    /// Re-delivery of these records on the next cycle is guaranteed, not
    /// merely possible.
    #[error("{inserted} records were inserted into the sink but could not be marked processed")]
    MarkingInconsistency {
        inserted: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Counters collected by the relay.
#[derive(Debug, Clone, Default)]
struct RelayMetrics {
    cycles_total: u64,
    cycles_failed_total: u64,
    records_relayed_total: u64,
    records_skipped_total: u64,
    marking_inconsistencies_total: u64,
    last_cycle_duration_ms: u64,
    max_cycle_duration_ms: u64,
}

impl RelayMetrics {
    fn record_cycle(&mut self, relayed: usize, skipped: usize, duration_ms: u64) {
        self.cycles_total += 1;
        self.records_relayed_total += relayed as u64;
        self.records_skipped_total += skipped as u64;
        self.last_cycle_duration_ms = duration_ms;
        if duration_ms > self.max_cycle_duration_ms {
            self.max_cycle_duration_ms = duration_ms;
        }
    }

    fn record_failure(&mut self, marking_inconsistency: bool) {
        self.cycles_total += 1;
        self.cycles_failed_total += 1;
        if marking_inconsistency {
            self.marking_inconsistencies_total += 1;
        }
    }

    fn snapshot(&self) -> RelayMetricsSnapshot {
        RelayMetricsSnapshot {
            cycles_total: self.cycles_total,
            cycles_failed_total: self.cycles_failed_total,
            records_relayed_total: self.records_relayed_total,
            records_skipped_total: self.records_skipped_total,
            marking_inconsistencies_total: self.marking_inconsistencies_total,
            last_cycle_duration_ms: self.last_cycle_duration_ms,
            max_cycle_duration_ms: self.max_cycle_duration_ms,
        }
    }
}

/// Snapshot of relay metrics for reporting.
#[derive(Debug, Clone)]
pub struct RelayMetricsSnapshot {
    pub cycles_total: u64,
    pub cycles_failed_total: u64,
    pub records_relayed_total: u64,
    pub records_skipped_total: u64,
    pub marking_inconsistencies_total: u64,
    pub last_cycle_duration_ms: u64,
    pub max_cycle_duration_ms: u64,
}

impl std::fmt::Display for RelayMetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Relay Metrics:
  Cycles: {} ({} failed)
  Records Relayed: {}
  Records Skipped: {}
  Marking Inconsistencies: {}
  Last Cycle Duration: {} ms
  Max Cycle Duration: {} ms",
            self.cycles_total,
            self.cycles_failed_total,
            self.records_relayed_total,
            self.records_skipped_total,
            self.marking_inconsistencies_total,
            self.last_cycle_duration_ms,
            self.max_cycle_duration_ms
        )
    }
}

/// Transform one stored record into the sink's insert row shape.
///
/// Failure here is per-record: the caller skips the record for this cycle
/// and leaves it pending.
fn transform_record(record: &EventRecordView) -> Result<EventLogRow, TransformError> {
    let context = EventContext::from_value(record.event_context.clone())?;
    Ok(EventLogRow {
        event_type: record.event_type.clone(),
        event_date_time: record.event_date_time,
        environment: record.environment.clone(),
        event_context: context.to_canonical_json()?,
        metadata_version: record.metadata_version,
    })
}

/// Outbox Relay Service.
///
/// Stateless between cycles apart from metrics; safe to trigger from a
/// periodic scheduler, including overlapping invocations (row-level
/// claiming keeps concurrent cycles on disjoint id sets).
pub struct OutboxRelay {
    pool: PgPool,
    repository: PostgresOutboxRepository,
    sink: Arc<dyn EventLogSink>,
    reporter: Arc<dyn ErrorReporter>,
    config: RelayConfig,
    metrics: Arc<Mutex<RelayMetrics>>,
}

impl OutboxRelay {
    pub fn new(
        pool: PgPool,
        sink: Arc<dyn EventLogSink>,
        reporter: Arc<dyn ErrorReporter>,
        config: RelayConfig,
    ) -> Self {
        Self {
            repository: PostgresOutboxRepository::new(pool.clone()),
            pool,
            sink,
            reporter,
            config,
            metrics: Arc::new(Mutex::new(RelayMetrics::default())),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Get a snapshot of current metrics (thread-safe).
    pub fn metrics(&self) -> RelayMetricsSnapshot {
        self.metrics.lock().unwrap().snapshot()
    }

    /// Run one relay cycle over at most `batch_size` pending records.
    ///
    /// Returns the number of records marked processed. An empty pending set
    /// is a no-op cycle, not an error.
    pub async fn run_cycle(&self, batch_size: usize) -> Result<usize, RelayError> {
        let start = Instant::now();

        match self.cycle(batch_size).await {
            Ok((relayed, skipped)) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                self.metrics
                    .lock()
                    .unwrap()
                    .record_cycle(relayed, skipped, duration_ms);
                Ok(relayed)
            }
            Err(e) => {
                let inconsistency = matches!(e, RelayError::MarkingInconsistency { .. });
                if inconsistency {
                    error!(
                        error = %e,
                        "Records were inserted into the sink but not marked processed; \
                         the next cycle WILL re-deliver them"
                    );
                }
                self.metrics.lock().unwrap().record_failure(inconsistency);
                Err(e)
            }
        }
    }

    async fn cycle(&self, batch_size: usize) -> Result<(usize, usize), RelayError> {
        let mut tx = self.pool.begin().await?;

        // Frozen id set: records appended after this point belong to the
        // next cycle, and the row locks keep concurrent cycles off this set.
        let records = self.repository.claim_pending(&mut tx, batch_size).await?;
        if records.is_empty() {
            debug!("No pending records");
            return Ok((0, 0));
        }

        info!(record_count = records.len(), "Processing pending outbox records");

        let mut rows = Vec::with_capacity(records.len());
        let mut ids = Vec::with_capacity(records.len());
        let mut skipped = 0usize;
        for record in &records {
            match transform_record(record) {
                Ok(row) => {
                    rows.push(row);
                    ids.push(record.id);
                }
                Err(e) => {
                    warn!(
                        record_id = record.id,
                        event_type = %record.event_type,
                        error = %e,
                        "Skipping record that failed transform; it stays pending for a later cycle"
                    );
                    self.reporter.capture(&e);
                    skipped += 1;
                }
            }
        }

        if rows.is_empty() {
            warn!(
                skipped = skipped,
                "Every claimed record failed transform; nothing to insert"
            );
            return Ok((0, skipped));
        }

        // Single all-or-nothing insert. Timeout means the outcome is
        // unknown, which is treated as failure: nothing gets marked.
        match timeout(self.config.cycle_timeout, self.sink.insert(&rows)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(RelayError::Sink(e)),
            Err(_) => return Err(RelayError::SinkTimeout(self.config.cycle_timeout)),
        }

        // Insert-then-mark: from here on a failure leaves rows in the sink
        // with the flag unset, which is the marking-inconsistency window.
        let marked = self
            .repository
            .mark_processed(&mut tx, &ids)
            .await
            .map_err(|e| RelayError::MarkingInconsistency {
                inserted: ids.len(),
                source: Box::new(e),
            })?;
        tx.commit()
            .await
            .map_err(|e| RelayError::MarkingInconsistency {
                inserted: ids.len(),
                source: Box::new(e),
            })?;

        info!(
            processed_count = marked,
            skipped_count = skipped,
            "Successfully relayed outbox batch"
        );
        Ok((marked as usize, skipped))
    }

    /// Run one cycle, retrying whole-cycle failures with exponential
    /// backoff up to the configured bound.
    ///
    /// Marking inconsistencies are not retried: the sink already holds the
    /// rows and an immediate re-run only manufactures more duplicates.
    pub async fn run_cycle_with_retry(&self, batch_size: usize) -> Result<usize, RelayError> {
        let mut attempt = 0u32;

        loop {
            match self.run_cycle(batch_size).await {
                Ok(count) => return Ok(count),
                Err(e @ RelayError::MarkingInconsistency { .. }) => {
                    self.reporter.capture(&e);
                    return Err(e);
                }
                Err(e) => {
                    if !self.config.backoff.can_retry(attempt) {
                        error!(
                            attempts = attempt + 1,
                            error = %e,
                            "Cycle failed after exhausting retries; records stay pending"
                        );
                        self.reporter.capture(&e);
                        return Err(e);
                    }

                    let delay = self.config.backoff.calculate_delay(attempt);
                    warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Cycle failed, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
