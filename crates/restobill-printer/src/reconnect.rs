//! # Reconnect Schedule
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │               Reconnect Schedule (defaults)                             │
//! │                                                                         │
//! │  delay(n) = min(base × multiplier^n, max_delay)                        │
//! │                                                                         │
//! │  Attempt 0: 1s                                                          │
//! │  Attempt 1: 2s                                                          │
//! │  Attempt 2: 4s                                                          │
//! │  Attempt 3: 8s                                                          │
//! │  Attempt 4: 16s     ← 5th failure: give up, manual reconnect required  │
//! │  Cap: 30s                                                               │
//! │                                                                         │
//! │  No jitter: one printer per till, nothing to de-synchronise.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;

use crate::config::ReconnectSettings;

/// Delay before reconnect attempt `attempt` (0-based).
pub fn delay_for_attempt(settings: &ReconnectSettings, attempt: u32) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let millis = settings.base_delay_ms as f64 * settings.multiplier.powi(exponent);
    let capped = millis.min(settings.max_delay_ms as f64);

    Duration::from_millis(capped as u64)
}

/// Stateful schedule the manager walks through while reconnecting.
pub struct ReconnectPolicy {
    backoff: ExponentialBackoff,
    max_delay: Duration,
    max_attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(settings: &ReconnectSettings) -> Self {
        let max_delay = Duration::from_millis(settings.max_delay_ms);

        let mut backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(settings.base_delay_ms),
            randomization_factor: 0.0,
            multiplier: settings.multiplier,
            max_interval: max_delay,
            max_elapsed_time: None,
            ..Default::default()
        };
        backoff.reset();

        ReconnectPolicy {
            backoff,
            max_delay,
            max_attempts: settings.max_attempts,
        }
    }

    /// Delay before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        self.backoff
            .next_backoff()
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Whether `failures` consecutive failures means giving up.
    pub fn exhausted(&self, failures: u32) -> bool {
        failures >= self.max_attempts
    }

    /// Starts the schedule over from the base delay.
    pub fn reset(&mut self) {
        self.backoff.reset();
    }
}
