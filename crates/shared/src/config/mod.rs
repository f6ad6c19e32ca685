//! Configuration module for the eventline outbox relay.
//!
//! Configuration is loaded once at startup, validated, and passed to
//! services via dependency injection. There are no silent fallbacks for
//! required values.
//!
//! # Environment Variables
//!
//! ## Required
//!
//! - `EVENTLINE_DATABASE_URL`: PostgreSQL connection string
//! - `EVENTLINE_CLICKHOUSE_URL`: ClickHouse HTTP endpoint (e.g. "http://localhost:8123")
//! - `EVENTLINE_ENVIRONMENT`: tag stamped into every appended record (e.g. "production")
//!
//! ## Optional
//!
//! - `EVENTLINE_DB_POOL_SIZE`: connection pool size (default: 10)
//! - `EVENTLINE_CLICKHOUSE_DATABASE`: target database (default: "default")
//! - `EVENTLINE_CLICKHOUSE_TABLE`: target table (default: "event_log")
//! - `EVENTLINE_CLICKHOUSE_USER` / `EVENTLINE_CLICKHOUSE_PASSWORD`: credentials
//! - `EVENTLINE_CLICKHOUSE_TIMEOUT_SECS`: HTTP request timeout (default: 30)
//! - `EVENTLINE_BATCH_SIZE`: per-cycle record cap (default: 1000)
//! - `EVENTLINE_MAX_RETRIES`: per-cycle retry bound (default: 3)
//! - `EVENTLINE_RETRY_BACKOFF_SECS`: base delay, exponential (default: 1)
//! - `EVENTLINE_MAX_BACKOFF_SECS`: backoff cap (default: 60)
//! - `EVENTLINE_POLL_INTERVAL_SECS`: scheduler period (default: 60)
//! - `EVENTLINE_CYCLE_TIMEOUT_SECS`: bound on the in-flight sink call (default: 30)
//! - `EVENTLINE_LOG_LEVEL`: default tracing filter (default: "info")
//! - `EVENTLINE_LOG_JSON`: "1" for JSON log output (default: 0)

pub mod dto;
pub mod error;
pub mod loader;
pub mod validator;

pub use dto::{AppConfig, ClickHouseConfig, DatabaseConfig, LoggingConfig, RelaySettings};
pub use error::{ConfigError, Result};
pub use loader::ConfigLoader;
pub use validator::{
    validate_app_config, validate_clickhouse_url, validate_database_url, validate_relay_settings,
};
