//! Configuration validation.
//!
//! Fail-fast checks run once after loading, so a bad deployment surfaces at
//! startup instead of on the first relay cycle.

use super::dto::AppConfig;
use super::error::{ConfigError, Result};
use crate::config::RelaySettings;

/// Validate a full application configuration.
pub fn validate_app_config(config: &AppConfig) -> Result<()> {
    validate_database_url(&config.database.url)?;
    validate_clickhouse_url(&config.clickhouse.url)?;
    validate_relay_settings(&config.relay)?;

    if config.environment.trim().is_empty() {
        return Err(ConfigError::Validation(
            "EVENTLINE_ENVIRONMENT must not be blank".to_string(),
        ));
    }
    if config.database.pool_size == 0 {
        return Err(ConfigError::Validation(
            "EVENTLINE_DB_POOL_SIZE must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Validate a PostgreSQL connection string.
pub fn validate_database_url(url: &str) -> Result<()> {
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "database URL must use the postgres:// scheme, got: {}",
            url
        )))
    }
}

/// Validate the ClickHouse HTTP endpoint.
pub fn validate_clickhouse_url(url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "ClickHouse URL must use http:// or https://, got: {}",
            url
        )))
    }
}

/// Validate relay tuning values.
pub fn validate_relay_settings(relay: &RelaySettings) -> Result<()> {
    if relay.batch_size == 0 {
        return Err(ConfigError::Validation(
            "EVENTLINE_BATCH_SIZE must be at least 1".to_string(),
        ));
    }
    if relay.cycle_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "EVENTLINE_CYCLE_TIMEOUT_SECS must be at least 1".to_string(),
        ));
    }
    if relay.retry_backoff_secs > relay.max_backoff_secs {
        return Err(ConfigError::Validation(
            "EVENTLINE_RETRY_BACKOFF_SECS must not exceed EVENTLINE_MAX_BACKOFF_SECS".to_string(),
        ));
    }
    Ok(())
}
