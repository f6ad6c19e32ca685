//! Sink clients for the analytical event log.

pub mod clickhouse;

pub use clickhouse::{ClickHouseEventLogSink, ClickHouseSinkConfig};
