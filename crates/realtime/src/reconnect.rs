//! Backoff schedule for re-opening a dropped subscription.

use std::time::Duration;

/// Exponential backoff parameters.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Wait before the first retry after a failure.
    pub initial_delay: Duration,
    /// Cap on the wait between retries.
    pub max_delay: Duration,
    /// Growth factor applied after each failed attempt.
    pub multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// The delay that follows `current`, clamped to `max_delay`.
pub fn next_delay(current: Duration, config: &ReconnectConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}
