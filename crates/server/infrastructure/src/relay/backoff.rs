//! Exponential backoff configuration for whole-cycle retries.
//!
//! The delay follows `min(base * 2^attempt, max) ± jitter`. Jitter keeps
//! schedulers on multiple instances from retrying in lockstep.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_DELAY_SECS: u64 = 1;
const DEFAULT_MAX_DELAY_SECS: u64 = 60;
const DEFAULT_JITTER_FACTOR: f64 = 0.1;
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Retry strategy applied by the relay at whole-cycle granularity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Base delay in seconds (default: 1)
    pub base_delay_secs: u64,

    /// Maximum delay in seconds (default: 60)
    pub max_delay_secs: u64,

    /// Jitter as a fraction of the delay (0.0-1.0, default: 0.1 = ±10%)
    pub jitter_factor: f64,

    /// Retry attempts before the failure is surfaced (default: 3)
    pub max_retries: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_secs: DEFAULT_BASE_DELAY_SECS,
            max_delay_secs: DEFAULT_MAX_DELAY_SECS,
            jitter_factor: DEFAULT_JITTER_FACTOR,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl BackoffConfig {
    pub fn new(
        base_delay_secs: u64,
        max_delay_secs: u64,
        jitter_factor: f64,
        max_retries: u32,
    ) -> Self {
        Self {
            base_delay_secs,
            max_delay_secs,
            jitter_factor,
            max_retries,
        }
    }

    /// Calculate the delay before retry attempt `attempt` (0-indexed).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let raw = self
            .base_delay_secs
            .saturating_mul(2u64.saturating_pow(attempt));
        let capped = raw.min(self.max_delay_secs) as i64;

        let jitter_range = (capped as f64 * self.jitter_factor) as i64;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0
        };

        Duration::from_secs((capped + jitter).max(0) as u64)
    }

    /// Whether another attempt is allowed after `attempt` failures.
    pub fn can_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn defaults() {
        let config = BackoffConfig::default();
        assert_eq!(config.base_delay_secs, 1);
        assert_eq!(config.max_delay_secs, 60);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn delay_grows_exponentially() {
        let config = BackoffConfig::new(5, 3600, 0.0, 5);
        assert_eq!(config.calculate_delay(0).as_secs(), 5);
        assert_eq!(config.calculate_delay(1).as_secs(), 10);
        assert_eq!(config.calculate_delay(2).as_secs(), 20);
        assert_eq!(config.calculate_delay(3).as_secs(), 40);
    }

    #[test]
    fn delay_is_capped() {
        let config = BackoffConfig::new(5, 30, 0.0, 5);
        assert_eq!(config.calculate_delay(20).as_secs(), 30);
    }

    #[test]
    fn jitter_produces_variation() {
        let config = BackoffConfig::new(100, 3600, 0.2, 5);
        let delays: HashSet<u64> = (0..30).map(|_| config.calculate_delay(0).as_secs()).collect();
        assert!(delays.len() > 1, "expected jittered delays to vary");
        assert!(delays.iter().all(|&d| (80..=120).contains(&d)));
    }

    #[test]
    fn retry_bound() {
        let config = BackoffConfig::default();
        assert!(config.can_retry(0));
        assert!(config.can_retry(2));
        assert!(!config.can_retry(3));
        assert!(!config.can_retry(10));
    }
}
