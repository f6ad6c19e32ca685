//! Periodic trigger for the relay.

use crate::relay::OutboxRelay;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

/// Configuration for the Cycle Scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Delay between cycle starts
    pub interval: Duration,
    /// Batch size passed to each cycle
    pub batch_size: usize,
    /// Emit a metrics snapshot every this many cycles
    pub metrics_report_every: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            batch_size: 1000,
            metrics_report_every: 10,
        }
    }
}

/// Drives the relay on a fixed interval.
///
/// A cycle that outlives the interval delays the next tick instead of
/// stacking up behind it; overlap is harmless but pointless because the
/// relay claims with row locks either way.
pub struct CycleScheduler {
    relay: Arc<OutboxRelay>,
    config: SchedulerConfig,
}

impl CycleScheduler {
    pub fn new(relay: Arc<OutboxRelay>, config: SchedulerConfig) -> Self {
        Self { relay, config }
    }

    /// Run cycles forever. Cancel by dropping the task.
    pub async fn run(&self) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            batch_size = self.config.batch_size,
            "🚀 Starting outbox relay scheduler"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = 0u64;

        loop {
            ticker.tick().await;

            match self.relay.run_cycle_with_retry(self.config.batch_size).await {
                Ok(0) => debug!("Cycle complete, nothing pending"),
                Ok(count) => info!(relayed = count, "Cycle complete"),
                Err(e) => error!(error = %e, "Cycle failed; records remain pending"),
            }

            cycles += 1;
            if self.config.metrics_report_every > 0 && cycles % self.config.metrics_report_every == 0
            {
                info!("{}", self.relay.metrics());
            }
        }
    }
}
