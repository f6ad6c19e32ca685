//! Shared configuration for the eventline services.

pub mod config;

pub use config::{
    AppConfig, ClickHouseConfig, ConfigError, ConfigLoader, DatabaseConfig, LoggingConfig,
    RelaySettings,
};
