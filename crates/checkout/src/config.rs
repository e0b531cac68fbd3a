//! Environment-driven configuration for the checkout layer.

use std::env;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use demoshop_catalog::StockPolicy;

/// Settlement timing and outcome knobs.
#[derive(Debug, Clone)]
pub struct SettlementConfig {
    /// Lower bound of the simulated payment-processor latency.
    pub delay_min: Duration,
    /// Upper bound of the simulated payment-processor latency.
    pub delay_max: Duration,
    /// Probability in `[0, 1]` that a settlement completes the order.
    pub success_rate: f64,
    /// How often the worker polls the queue when idle.
    pub poll_interval: Duration,
    /// Attempts at persisting a settled order before abandoning the task.
    pub max_update_attempts: u32,
    /// Delay before a failed persistence attempt is retried.
    pub retry_backoff: Duration,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            delay_min: Duration::from_secs(2),
            delay_max: Duration::from_secs(10),
            success_rate: 0.9,
            poll_interval: Duration::from_millis(100),
            max_update_attempts: 3,
            retry_backoff: Duration::from_millis(200),
        }
    }
}

impl SettlementConfig {
    /// Draw a settlement delay uniformly from `[delay_min, delay_max]`.
    pub fn draw_delay(&self) -> Duration {
        if self.delay_max <= self.delay_min {
            return self.delay_min;
        }
        rand::thread_rng().gen_range(self.delay_min..=self.delay_max)
    }
}

/// Top-level checkout configuration.
#[derive(Debug, Clone, Default)]
pub struct CheckoutConfig {
    pub stock_policy: StockPolicy,
    pub settlement: SettlementConfig,
}

impl CheckoutConfig {
    /// Load from the environment, falling back to defaults on missing or
    /// malformed values (with a logged warning, never a startup failure).
    pub fn from_env() -> Self {
        let defaults = SettlementConfig::default();

        let stock_policy = if get_env_bool("STOCK_ENFORCEMENT", false) {
            StockPolicy::Enforced
        } else {
            StockPolicy::Permissive
        };

        let settlement = SettlementConfig {
            delay_min: Duration::from_millis(get_env_u64(
                "SETTLEMENT_DELAY_MIN_MS",
                defaults.delay_min.as_millis() as u64,
            )),
            delay_max: Duration::from_millis(get_env_u64(
                "SETTLEMENT_DELAY_MAX_MS",
                defaults.delay_max.as_millis() as u64,
            )),
            success_rate: get_env_f64("SETTLEMENT_SUCCESS_RATE", defaults.success_rate)
                .clamp(0.0, 1.0),
            ..defaults
        };

        Self {
            stock_policy,
            settlement,
        }
    }
}

fn get_env_u64(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            warn!(key, value, default, "invalid integer env value, using default");
            default
        }),
        Err(_) => default,
    }
}

fn get_env_f64(key: &str, default: f64) -> f64 {
    match env::var(key) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            warn!(key, value, default, "invalid float env value, using default");
            default
        }),
        Err(_) => default,
    }
}

fn get_env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            warn!(key, value, default, "invalid bool env value, using default");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = CheckoutConfig::default();
        assert_eq!(config.stock_policy, StockPolicy::Permissive);
        assert!(config.settlement.delay_min <= config.settlement.delay_max);
        assert!((0.0..=1.0).contains(&config.settlement.success_rate));
        assert!(config.settlement.max_update_attempts >= 1);
    }

    #[test]
    fn draw_delay_stays_in_range() {
        let config = SettlementConfig {
            delay_min: Duration::from_millis(10),
            delay_max: Duration::from_millis(20),
            ..Default::default()
        };
        for _ in 0..100 {
            let d = config.draw_delay();
            assert!(d >= config.delay_min && d <= config.delay_max);
        }
    }

    #[test]
    fn draw_delay_degenerate_range_returns_min() {
        let config = SettlementConfig {
            delay_min: Duration::from_millis(30),
            delay_max: Duration::from_millis(30),
            ..Default::default()
        };
        assert_eq!(config.draw_delay(), Duration::from_millis(30));
    }
}
