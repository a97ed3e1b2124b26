//! Linear-step reconnection backoff.
//!
//! The delay between reconnection attempts grows by a fixed increment per
//! failed cycle and is capped at a ceiling. The growth is additive, not
//! exponential, to match the cadence the service expects from its clients.

use std::time::Duration;

/// Tuning for the reconnect delay.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// First delay after a failure, and the value restored on success.
    pub floor: Duration,
    /// Added to the delay after each further failed cycle.
    pub step: Duration,
    /// The delay never exceeds this.
    pub ceiling: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            floor: Duration::from_millis(500),
            step: Duration::from_millis(500),
            ceiling: Duration::from_secs(10),
        }
    }
}

/// The reconnect-delay counter: monotonically non-decreasing across
/// failures, reset to the floor on a successful open.
#[derive(Debug)]
pub struct Backoff {
    config: BackoffConfig,
    current: Duration,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        let current = config.floor;
        Self { config, current }
    }

    /// Returns the delay to impose before the next attempt and advances
    /// the counter for the one after.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current + self.config.step).min(self.config.ceiling);
        delay
    }

    /// Restores the delay to its floor. Called on every successful open.
    pub fn reset(&mut self) {
        self.current = self.config.floor;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}
