use crate::config::BackoffConfig;
use std::time::Duration;

/// Exponential backoff shared by the politeness controller and queue retries
///
/// `delay_for(0)` is zero; attempt `n >= 1` waits
/// `min(cap, base * multiplier^(n-1))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub multiplier: f64,
    pub cap: Duration,
}

impl BackoffPolicy {
    pub fn new(base: Duration, multiplier: f64, cap: Duration) -> Self {
        Self {
            base,
            multiplier,
            cap,
        }
    }

    pub fn from_config(config: &BackoffConfig) -> Self {
        Self::new(
            Duration::from_millis(config.base_ms),
            config.multiplier,
            Duration::from_millis(config.cap_ms),
        )
    }

    /// Delay before attempt number `attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let factor = self.multiplier.max(1.0).powi(attempt.saturating_sub(1) as i32);
        let millis = self.base.as_millis() as f64 * factor;
        let cap = self.cap.as_millis() as f64;

        if !millis.is_finite() || millis >= cap {
            self.cap
        } else {
            Duration::from_millis(millis as u64)
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&BackoffConfig::default())
    }
}
