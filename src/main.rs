//! Eventline server binary.
//!
//! Wires configuration, the PostgreSQL outbox, the ClickHouse sink and the
//! relay scheduler together, then runs cycles until terminated.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use eventline_infrastructure::{
    BackoffConfig, ClickHouseEventLogSink, ClickHouseSinkConfig, CycleScheduler, OutboxRelay,
    PostgresOutboxRepository, PostgresUserRepository, RelayConfig, SchedulerConfig,
    TracingReporter,
};
use eventline_shared::config::{AppConfig, ConfigLoader};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_file = PathBuf::from(".env");
    let loader = ConfigLoader::new(env_file.exists().then_some(env_file));
    let config = loader.load_app_config()?;

    init_tracing(&config);
    info!(environment = %config.environment, "🚀 Starting eventline server");

    let pool = PgPoolOptions::new()
        .max_connections(config.database.pool_size)
        .connect(&config.database.url)
        .await?;

    PostgresOutboxRepository::new(pool.clone())
        .run_migrations()
        .await?;
    PostgresUserRepository::new(pool.clone())
        .run_migrations()
        .await?;
    info!("✅ Database migrations applied");

    let sink = Arc::new(ClickHouseEventLogSink::new(ClickHouseSinkConfig {
        url: config.clickhouse.url.clone(),
        database: config.clickhouse.database.clone(),
        table: config.clickhouse.table.clone(),
        user: config.clickhouse.user.clone(),
        password: config.clickhouse.password.clone(),
        timeout: Duration::from_secs(config.clickhouse.timeout_secs),
    })?);

    let relay = Arc::new(OutboxRelay::new(
        pool,
        sink,
        Arc::new(TracingReporter::new()),
        RelayConfig {
            batch_size: config.relay.batch_size,
            cycle_timeout: Duration::from_secs(config.relay.cycle_timeout_secs),
            backoff: BackoffConfig {
                base_delay_secs: config.relay.retry_backoff_secs,
                max_delay_secs: config.relay.max_backoff_secs,
                max_retries: config.relay.max_retries,
                ..BackoffConfig::default()
            },
        },
    ));

    let scheduler = CycleScheduler::new(
        relay,
        SchedulerConfig {
            interval: Duration::from_secs(config.relay.poll_interval_secs),
            batch_size: config.relay.batch_size,
            ..SchedulerConfig::default()
        },
    );
    scheduler.run().await;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    if config.logging.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
