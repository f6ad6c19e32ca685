//! Infrastructure layer for the eventline outbox relay.
//!
//! Postgres persistence for the outbox and users, the ClickHouse sink
//! client, the relay cycle itself, the periodic scheduler, and the
//! tracing-backed error reporter.

pub mod persistence;
pub mod relay;
pub mod reporting;
pub mod scheduler;
pub mod sink;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use persistence::{PostgresOutboxRepository, PostgresUserRepository};
pub use relay::{BackoffConfig, OutboxRelay, RelayConfig, RelayError, RelayMetricsSnapshot};
pub use reporting::TracingReporter;
pub use scheduler::{CycleScheduler, SchedulerConfig};
pub use sink::{ClickHouseEventLogSink, ClickHouseSinkConfig};
