//! Backoff schedule shared by every upstream call.
//!
//! The schedule is a pure function of the attempt index, so callers can
//! assert it without waiting on a clock.

use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub enabled: bool,
    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2,
        }
    }
}

impl RetryPolicy {
    pub fn disabled() -> Self {
        Self { enabled: false, max_retries: 0, ..Self::default() }
    }

    /// Retries actually permitted, honouring the `enabled` switch.
    pub fn effective_retries(&self) -> u32 {
        if self.enabled {
            self.max_retries
        } else {
            0
        }
    }

    /// Delay before retry number `attempt` (zero-based):
    /// `min(base * multiplier^attempt, max)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.backoff_multiplier).checked_pow(attempt);
        let millis = factor
            .and_then(|factor| self.base_delay_ms.checked_mul(factor))
            .map(|millis| millis.min(self.max_delay_ms))
            .unwrap_or(self.max_delay_ms);
        Duration::from_millis(millis)
    }

    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.effective_retries()).map(|attempt| self.delay_for(attempt)).collect()
    }
}

/// 5xx and 429 are transient; every other status is final.
pub fn is_retryable_status(status: u16) -> bool {
    status >= 500 || status == 429
}
