//! Retry delay policy for the dispatch loop.

use std::time::Duration;

use rand::Rng;

use crate::config::BackoffSettings;

/// Computes the pause before a retry attempt.
///
/// Delays grow exponentially from `initial_delay_ms` and are capped at
/// `max_delay_ms`. Random jitter spreads out concurrent dispatches that
/// would otherwise retry against the same server in lockstep. The policy
/// is stateless: the dispatcher passes in its own attempt counter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    initial_ms: f64,
    max_ms: f64,
    multiplier: f64,
    jitter_factor: f64,
}

impl RetryPolicy {
    pub fn new(settings: &BackoffSettings) -> Self {
        Self {
            initial_ms: settings.initial_delay_ms as f64,
            max_ms: settings.max_delay_ms as f64,
            multiplier: settings.multiplier,
            jitter_factor: settings.jitter_factor,
        }
    }

    /// Delay before the retry that follows `failed_attempts` failures.
    ///
    /// One failed attempt waits `initial_delay_ms`; each further failure
    /// multiplies the wait. Never returns a zero duration, so a retry
    /// always yields to the runtime.
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        // powi saturates to +inf well past any realistic attempt count
        let exponent = failed_attempts.saturating_sub(1).min(63) as i32;
        let base = self.initial_ms * self.multiplier.powi(exponent);
        let capped = base.min(self.max_ms).max(1.0);

        let millis = if self.jitter_factor > 0.0 {
            let spread = capped * self.jitter_factor;
            let jitter = rand::rng().random_range(-spread..spread);
            (capped + jitter).max(1.0)
        } else {
            capped
        };

        Duration::from_millis(millis as u64)
    }
}
