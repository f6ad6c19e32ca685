//! Outbox Relay
//!
//! The batched read → transform → insert → mark-processed pipeline and its
//! retry policy.

pub mod backoff;
pub mod relay;

pub use backoff::BackoffConfig;
pub use relay::{OutboxRelay, RelayConfig, RelayError, RelayMetricsSnapshot};
