use std::time::Duration;
use tokio::time::Instant;

/// Tracks the politeness state of one platform during a run
///
/// Each platform has its own throttle; nothing here is shared across
/// platforms.
#[derive(Debug, Clone, Default)]
pub struct PlatformThrottle {
    /// Number of requests issued to this platform in the current run
    pub request_count: u32,

    /// Timestamp of the last request to this platform
    pub last_request_time: Option<Instant>,

    /// Requests are held until this instant after a rate-limit answer
    pub cooldown_until: Option<Instant>,

    /// Transport/server errors since the last success
    pub consecutive_errors: u32,
}

impl PlatformThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time still to wait so the previous request is at least `spacing` ago
    pub fn spacing_wait(&self, spacing: Duration, now: Instant) -> Duration {
        match self.last_request_time {
            Some(last) => spacing.saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Time left in an active rate-limit cool-down
    pub fn cooldown_wait(&self, now: Instant) -> Duration {
        self.cooldown_until
            .map(|until| until.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    /// Records that a request was issued
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }

    /// Holds all requests until `now + cooldown`
    pub fn start_cooldown(&mut self, now: Instant, cooldown: Duration) {
        let until = now + cooldown;
        self.cooldown_until = Some(match self.cooldown_until {
            Some(existing) if existing > until => existing,
            _ => until,
        });
    }

    pub fn record_error(&mut self) {
        self.consecutive_errors += 1;
    }

    pub fn record_success(&mut self) {
        self.consecutive_errors = 0;
    }

    /// Returns true while a rate-limit cool-down is active
    pub fn is_cooling_down(&self, now: Instant) -> bool {
        self.cooldown_wait(now) > Duration::ZERO
    }
}
