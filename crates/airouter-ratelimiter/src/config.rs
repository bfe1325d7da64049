use std::time::Duration;

/// Per-endpoint rate limit tunables (design doc §4.2). The per-minute
/// window is the primary limit; the burst window enforces a shorter-horizon
/// cap so a tenant can't spend an entire minute's budget in a single instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimiterConfig {
    pub per_minute_limit: u32,
    pub window: Duration,
    pub burst_limit: u32,
    pub burst_window: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            per_minute_limit: 60,
            window: Duration::from_secs(60),
            burst_limit: 10,
            burst_window: Duration::from_secs(1),
        }
    }
}

impl RateLimiterConfig {
    pub fn builder() -> RateLimiterConfigBuilder {
        RateLimiterConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RateLimiterConfigBuilder {
    per_minute_limit: Option<u32>,
    window: Option<Duration>,
    burst_limit: Option<u32>,
    burst_window: Option<Duration>,
}

impl RateLimiterConfigBuilder {
    pub fn per_minute_limit(mut self, limit: u32) -> Self {
        self.per_minute_limit = Some(limit);
        self
    }

    pub fn window(mut self, duration: Duration) -> Self {
        self.window = Some(duration);
        self
    }

    pub fn burst_limit(mut self, limit: u32) -> Self {
        self.burst_limit = Some(limit);
        self
    }

    pub fn burst_window(mut self, duration: Duration) -> Self {
        self.burst_window = Some(duration);
        self
    }

    pub fn build(self) -> RateLimiterConfig {
        let defaults = RateLimiterConfig::default();
        RateLimiterConfig {
            per_minute_limit: self.per_minute_limit.unwrap_or(defaults.per_minute_limit),
            window: self.window.unwrap_or(defaults.window),
            burst_limit: self.burst_limit.unwrap_or(defaults.burst_limit),
            burst_window: self.burst_window.unwrap_or(defaults.burst_window),
        }
    }
}
