use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use airouter_core::{ErrorKind, RouterError, SlidingWindowCounter};
use chrono::{DateTime, Utc};

use crate::config::RateLimiterConfig;

/// Outcome of a `CheckAndConsume` call that was admitted.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitInfo {
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

struct PerKeyState {
    window: SlidingWindowCounter,
    burst: SlidingWindowCounter,
}

/// Sliding-window rate limiter keyed by (tenant, endpoint), as described in
/// design doc §4.2. Each key tracks two windows: the per-minute limit and a
/// shorter burst window, both evaluated on every call.
pub struct RateLimiter {
    config: RateLimiterConfig,
    state: Mutex<HashMap<(String, String), PerKeyState>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            state: Mutex::new(HashMap::new()),
        }
    }

    /// §4.2 `CheckAndConsume(tenantId, endpoint) -> (allowed, remaining, resetAtEpoch)`.
    pub fn check_and_consume(
        &self,
        tenant_id: &str,
        endpoint: &str,
    ) -> Result<RateLimitInfo, RouterError> {
        let now = Instant::now();
        let key = (tenant_id.to_string(), endpoint.to_string());

        let mut guard = self.state.lock().expect("rate limiter state poisoned");
        let entry = guard.entry(key).or_insert_with(|| PerKeyState {
            window: SlidingWindowCounter::new(self.config.window, self.config.per_minute_limit),
            burst: SlidingWindowCounter::new(self.config.burst_window, self.config.burst_limit),
        });

        let (burst_allowed, _) = entry.burst.check_and_consume(now);
        if !burst_allowed {
            return self.rejected(tenant_id, endpoint, entry.burst.reset_at(), now);
        }

        let (allowed, remaining) = entry.window.check_and_consume(now);
        if !allowed {
            return self.rejected(tenant_id, endpoint, entry.window.reset_at(), now);
        }

        #[cfg(feature = "metrics")]
        metrics::counter!("ratelimiter_admissions_total", "tenant" => tenant_id.to_string(), "endpoint" => endpoint.to_string()).increment(1);

        let reset_at = entry
            .window
            .reset_at()
            .map(|instant| instant_to_epoch(instant, now))
            .unwrap_or_else(Utc::now);

        Ok(RateLimitInfo { remaining, reset_at })
    }

    fn rejected(
        &self,
        tenant_id: &str,
        endpoint: &str,
        reset_at: Option<Instant>,
        now: Instant,
    ) -> Result<RateLimitInfo, RouterError> {
        #[cfg(feature = "metrics")]
        metrics::counter!("ratelimiter_rejections_total", "tenant" => tenant_id.to_string(), "endpoint" => endpoint.to_string()).increment(1);

        #[cfg(feature = "tracing")]
        tracing::debug!(tenant_id, endpoint, "rate limit exceeded");

        let retry_after = reset_at
            .map(|instant| instant.saturating_duration_since(now))
            .unwrap_or_default();

        Err(RouterError::new(
            ErrorKind::RateLimitExceeded,
            format!("rate limit exceeded for tenant '{tenant_id}' on endpoint '{endpoint}'"),
        )
        .with_retry_after(retry_after))
    }
}

/// Converts an `Instant` deadline into a wall-clock timestamp, anchored to
/// `now`. Approximate by construction (`Instant` carries no wall-clock
/// epoch), acceptable for a `Retry-After`-style hint.
fn instant_to_epoch(deadline: Instant, now: Instant) -> DateTime<Utc> {
    let delta = deadline.saturating_duration_since(now);
    Utc::now()
        + chrono::Duration::from_std(delta).unwrap_or_else(|_| chrono::Duration::zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn admits_up_to_the_per_minute_limit() {
        let config = RateLimiterConfig {
            per_minute_limit: 2,
            window: Duration::from_secs(60),
            burst_limit: 100,
            burst_window: Duration::from_secs(1),
        };
        let limiter = RateLimiter::new(config);

        assert!(limiter.check_and_consume("tenant-a", "/inference").is_ok());
        assert!(limiter.check_and_consume("tenant-a", "/inference").is_ok());

        let err = limiter.check_and_consume("tenant-a", "/inference").unwrap_err();
        assert_eq!(err.kind, ErrorKind::RateLimitExceeded);
    }

    #[test]
    fn burst_window_limits_within_the_per_minute_budget() {
        let config = RateLimiterConfig {
            per_minute_limit: 100,
            window: Duration::from_secs(60),
            burst_limit: 1,
            burst_window: Duration::from_secs(1),
        };
        let limiter = RateLimiter::new(config);

        assert!(limiter.check_and_consume("tenant-a", "/inference").is_ok());
        let err = limiter.check_and_consume("tenant-a", "/inference").unwrap_err();
        assert_eq!(err.kind, ErrorKind::RateLimitExceeded);
    }

    #[test]
    fn tenants_and_endpoints_are_tracked_independently() {
        let config = RateLimiterConfig {
            per_minute_limit: 1,
            window: Duration::from_secs(60),
            burst_limit: 100,
            burst_window: Duration::from_secs(1),
        };
        let limiter = RateLimiter::new(config);

        assert!(limiter.check_and_consume("tenant-a", "/inference").is_ok());
        assert!(limiter.check_and_consume("tenant-b", "/inference").is_ok());
        assert!(limiter.check_and_consume("tenant-a", "/embed").is_ok());
    }
}
