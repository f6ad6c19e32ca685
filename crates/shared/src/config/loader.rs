//! Configuration loader.
//!
//! Loads configuration from an optional `.env` file and environment
//! variables, then validates it. Values from the `.env` file take
//! precedence over the inherited process environment, which keeps local
//! development overrides out of the system environment.

use std::path::Path;
use std::str::FromStr;

use super::dto::{AppConfig, ClickHouseConfig, DatabaseConfig, LoggingConfig, RelaySettings};
use super::error::{ConfigError, Result};
use super::validator::validate_app_config;

/// Configuration loader.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Optional path to a .env file
    env_file_path: Option<std::path::PathBuf>,
}

impl ConfigLoader {
    pub fn new(env_file_path: Option<std::path::PathBuf>) -> Self {
        Self { env_file_path }
    }

    /// Load and validate the full application configuration.
    pub fn load_app_config(&self) -> Result<AppConfig> {
        if let Some(path) = &self.env_file_path {
            self.load_env_file(path)?;
        }

        let config = AppConfig::from_env()?;
        validate_app_config(&config)?;
        Ok(config)
    }

    fn load_env_file(&self, path: &Path) -> Result<()> {
        dotenv::from_path(path).map_err(|source| ConfigError::EnvFileLoad {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database: DatabaseConfig::from_env()?,
            clickhouse: ClickHouseConfig::from_env()?,
            relay: RelaySettings::from_env()?,
            environment: required_var("EVENTLINE_ENVIRONMENT")?,
            logging: LoggingConfig::from_env()?,
        })
    }
}

impl DatabaseConfig {
    /// # Required Variables
    ///
    /// - `EVENTLINE_DATABASE_URL`
    ///
    /// # Optional Variables
    ///
    /// - `EVENTLINE_DB_POOL_SIZE`: default 10
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            url: required_var("EVENTLINE_DATABASE_URL")?,
            pool_size: parse_optional_var("EVENTLINE_DB_POOL_SIZE", 10)?,
        })
    }
}

impl ClickHouseConfig {
    /// # Required Variables
    ///
    /// - `EVENTLINE_CLICKHOUSE_URL`
    ///
    /// # Optional Variables
    ///
    /// - `EVENTLINE_CLICKHOUSE_DATABASE`: default "default"
    /// - `EVENTLINE_CLICKHOUSE_TABLE`: default "event_log"
    /// - `EVENTLINE_CLICKHOUSE_USER`, `EVENTLINE_CLICKHOUSE_PASSWORD`
    /// - `EVENTLINE_CLICKHOUSE_TIMEOUT_SECS`: default 30
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            url: required_var("EVENTLINE_CLICKHOUSE_URL")?,
            database: optional_var("EVENTLINE_CLICKHOUSE_DATABASE")
                .unwrap_or_else(|| "default".to_string()),
            table: optional_var("EVENTLINE_CLICKHOUSE_TABLE")
                .unwrap_or_else(|| "event_log".to_string()),
            user: optional_var("EVENTLINE_CLICKHOUSE_USER"),
            password: optional_var("EVENTLINE_CLICKHOUSE_PASSWORD"),
            timeout_secs: parse_optional_var("EVENTLINE_CLICKHOUSE_TIMEOUT_SECS", 30)?,
        })
    }
}

impl RelaySettings {
    /// All variables are optional; defaults match [`RelaySettings::default`].
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            batch_size: parse_optional_var("EVENTLINE_BATCH_SIZE", defaults.batch_size)?,
            max_retries: parse_optional_var("EVENTLINE_MAX_RETRIES", defaults.max_retries)?,
            retry_backoff_secs: parse_optional_var(
                "EVENTLINE_RETRY_BACKOFF_SECS",
                defaults.retry_backoff_secs,
            )?,
            max_backoff_secs: parse_optional_var(
                "EVENTLINE_MAX_BACKOFF_SECS",
                defaults.max_backoff_secs,
            )?,
            poll_interval_secs: parse_optional_var(
                "EVENTLINE_POLL_INTERVAL_SECS",
                defaults.poll_interval_secs,
            )?,
            cycle_timeout_secs: parse_optional_var(
                "EVENTLINE_CYCLE_TIMEOUT_SECS",
                defaults.cycle_timeout_secs,
            )?,
        })
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self> {
        let json = match optional_var("EVENTLINE_LOG_JSON") {
            Some(raw) => raw == "1" || raw.eq_ignore_ascii_case("true"),
            None => false,
        };
        Ok(Self {
            level: optional_var("EVENTLINE_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            json,
        })
    }
}

fn required_var(var: &str) -> Result<String> {
    std::env::var(var).map_err(|_| ConfigError::MissingRequired {
        var: var.to_string(),
    })
}

fn optional_var(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty())
}

fn parse_optional_var<T: FromStr>(var: &str, default: T) -> Result<T> {
    match optional_var(var) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            var: var.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}
