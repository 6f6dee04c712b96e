//! Per-platform request pacing
//!
//! This module handles:
//! - Jittered spacing between consecutive requests to one platform
//! - The per-platform burst budget (requests per rolling minute)
//! - A fixed cool-down after HTTP 429
//! - A backoff penalty after consecutive transport/server errors
//!
//! Platforms never share a budget; each has its own `PlatformThrottle` and
//! burst limiter.

use crate::config::{CrawlerConfig, PolitenessBudget};
use crate::crawler::backoff::BackoffPolicy;
use crate::state::PlatformThrottle;
use governor::clock::Clock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use rand::Rng;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::time::Duration;
use tokio::time::Instant;

/// Window the burst budget is measured over
pub const BURST_WINDOW: Duration = Duration::from_secs(60);

/// Clock reading tokio's time source, so a paused test runtime drives the
/// burst limiter too
#[derive(Debug, Clone, Copy, Default)]
struct TokioClock;

impl Clock for TokioClock {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        Instant::now().into_std()
    }
}

type BurstLimiter =
    RateLimiter<NotKeyed, InMemoryState, TokioClock, NoOpMiddleware<std::time::Instant>>;

/// Builds the limiter for a `{burst}` budget: `burst` requests at once,
/// refilled evenly over one burst window
fn burst_limiter(budget: &PolitenessBudget) -> BurstLimiter {
    let burst = NonZeroU32::new(budget.burst).unwrap_or(NonZeroU32::MIN);
    let quota = Quota::with_period(BURST_WINDOW / burst.get())
        .unwrap_or_else(|| Quota::per_minute(burst))
        .allow_burst(burst);
    RateLimiter::direct_with_clock(quota, &TokioClock)
}

/// Samples `interval ± ratio` uniformly
///
/// The ratio is clamped to `[0, 1]`.
pub fn jittered_delay<R: Rng>(interval: Duration, ratio: f64, rng: &mut R) -> Duration {
    let ratio = ratio.clamp(0.0, 1.0);
    if ratio == 0.0 || interval.is_zero() {
        return interval;
    }

    let factor = rng.gen_range((1.0 - ratio)..=(1.0 + ratio));
    interval.mul_f64(factor)
}

/// Politeness controller for all platforms of a run
pub struct PolitenessController {
    throttles: HashMap<String, PlatformThrottle>,
    limiters: HashMap<String, BurstLimiter>,
    backoff: BackoffPolicy,
    cooldown: Duration,
    jitter_ratio: f64,
}

impl PolitenessController {
    pub fn new(backoff: BackoffPolicy, cooldown: Duration, jitter_ratio: f64) -> Self {
        Self {
            throttles: HashMap::new(),
            limiters: HashMap::new(),
            backoff,
            cooldown,
            jitter_ratio,
        }
    }

    pub fn from_config(config: &CrawlerConfig, backoff: BackoffPolicy) -> Self {
        Self::new(
            backoff,
            Duration::from_millis(config.rate_limit_cooldown_ms),
            config.jitter_ratio,
        )
    }

    fn throttle(&mut self, platform: &str) -> &mut PlatformThrottle {
        self.throttles
            .entry(platform.to_string())
            .or_insert_with(PlatformThrottle::new)
    }

    /// Computes how long to wait before the next request to `platform`
    ///
    /// The wait is the longer of the jittered spacing since the previous
    /// request (plus any error penalty) and an active cool-down. The burst
    /// budget is enforced separately in `wait_turn`.
    pub fn delay_before<R: Rng>(
        &mut self,
        platform: &str,
        budget: &PolitenessBudget,
        now: Instant,
        rng: &mut R,
    ) -> Duration {
        let interval = Duration::from_millis(budget.interval_ms);
        let jitter_ratio = self.jitter_ratio;
        let backoff = self.backoff;
        let state = self.throttle(platform);

        let spacing = jittered_delay(interval, jitter_ratio, rng)
            + backoff.delay_for(state.consecutive_errors);

        state
            .spacing_wait(spacing, now)
            .max(state.cooldown_wait(now))
    }

    /// Waits for this platform's turn and records the request
    pub async fn wait_turn(&mut self, platform: &str, budget: &PolitenessBudget) {
        let delay = {
            let mut rng = rand::thread_rng();
            self.delay_before(platform, budget, Instant::now(), &mut rng)
        };

        if !delay.is_zero() {
            tracing::debug!("Waiting {:?} before next request to {}", delay, platform);
            tokio::time::sleep(delay).await;
        }

        self.wait_for_burst(platform, budget).await;
        self.throttle(platform).record_request(Instant::now());
    }

    async fn wait_for_burst(&mut self, platform: &str, budget: &PolitenessBudget) {
        let limiter = self
            .limiters
            .entry(platform.to_string())
            .or_insert_with(|| burst_limiter(budget));

        while let Err(not_until) = limiter.check() {
            let wait = not_until
                .wait_time_from(TokioClock.now())
                .max(Duration::from_millis(1));
            tracing::debug!("Burst budget of {} spent, waiting {:?}", platform, wait);
            tokio::time::sleep(wait).await;
        }
    }

    pub fn record_success(&mut self, platform: &str) {
        self.throttle(platform).record_success();
    }

    /// Starts the fixed cool-down after a 429
    pub fn record_rate_limited(&mut self, platform: &str) {
        let cooldown = self.cooldown;
        tracing::warn!(
            "Rate limited by {}, cooling down for {:?}",
            platform,
            cooldown
        );
        self.throttle(platform).start_cooldown(Instant::now(), cooldown);
    }

    /// Adds to the platform's error penalty
    pub fn record_error(&mut self, platform: &str) {
        self.throttle(platform).record_error();
    }

    pub fn throttle_state(&self, platform: &str) -> Option<&PlatformThrottle> {
        self.throttles.get(platform)
    }
}
