use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use airouter_core::{ErrorKind, RouterError, SlidingWindowCounter};
use chrono::{DateTime, NaiveDate, Utc};

use crate::config::{QuotaConfig, Tier, TierLimits};

/// Snapshot returned by `CheckAndConsume`/`GetInfo` (design doc §4.3).
#[derive(Debug, Clone, Copy)]
pub struct QuotaInfo {
    pub tier: Tier,
    pub daily_requests_used: u64,
    pub daily_requests_limit: u64,
    pub remaining_requests: u64,
    pub daily_cost_used: f64,
    pub daily_cost_cap: f64,
    pub remaining_cost: f64,
    pub rate_per_minute: u32,
    pub current_rate: u32,
    pub resets_at: DateTime<Utc>,
}

struct TenantState {
    tier: Tier,
    daily_requests_used: u64,
    daily_cost_used: f64,
    last_reset_day: NaiveDate,
    rate_window: SlidingWindowCounter,
}

impl TenantState {
    fn new(tier: Tier, limits: TierLimits, today: NaiveDate) -> Self {
        Self {
            tier,
            daily_requests_used: 0,
            daily_cost_used: 0.0,
            last_reset_day: today,
            rate_window: SlidingWindowCounter::new(
                Duration::from_secs(60),
                limits.rate_per_minute,
            ),
        }
    }

    /// Lazily rolls the daily counters over when the stored day differs from
    /// today. Tier changes are picked up here too, since a new tier implies a
    /// new per-minute window size.
    fn roll_if_needed(&mut self, today: NaiveDate, tier: Tier, limits: TierLimits) {
        if self.tier != tier {
            self.tier = tier;
            self.rate_window = SlidingWindowCounter::new(
                Duration::from_secs(60),
                limits.rate_per_minute,
            );
        }
        if self.last_reset_day != today {
            self.daily_requests_used = 0;
            self.daily_cost_used = 0.0;
            self.last_reset_day = today;
        }
    }
}

fn resets_at(today: NaiveDate) -> DateTime<Utc> {
    let next_day = today.succ_opt().unwrap_or(today);
    next_day
        .and_hms_opt(0, 0, 0)
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
        .unwrap_or_else(Utc::now)
}

/// Per-tenant daily quota and per-minute rate accounting, keyed by tier
/// (design doc §4.3). One `QuotaManager` instance serves every tenant.
pub struct QuotaManager {
    config: QuotaConfig,
    tenants: Mutex<HashMap<String, TenantState>>,
}

impl QuotaManager {
    pub fn new(config: QuotaConfig) -> Self {
        Self {
            config,
            tenants: Mutex::new(HashMap::new()),
        }
    }

    /// §4.3 `CheckAndConsume(tenantId, tier) -> (allowed, info)`, request-count variant.
    pub fn check_and_consume(&self, tenant_id: &str, tier: Tier) -> Result<QuotaInfo, RouterError> {
        self.check_and_consume_cost(tenant_id, tier, 1, 0.0)
    }

    /// Cost-cap variant (§4.3): charges `cost_weight` requests and `cost` against
    /// the tenant's daily budget in a single admission.
    pub fn check_and_consume_cost(
        &self,
        tenant_id: &str,
        tier: Tier,
        request_weight: u64,
        cost: f64,
    ) -> Result<QuotaInfo, RouterError> {
        let today = Utc::now().date_naive();
        let limits = self.config.limits_for(tier);
        let now = Instant::now();

        let mut guard = self.tenants.lock().expect("quota manager state poisoned");
        let state = guard
            .entry(tenant_id.to_string())
            .or_insert_with(|| TenantState::new(tier, limits, today));
        state.roll_if_needed(today, tier, limits);

        if state.daily_requests_used + request_weight > limits.daily_requests {
            return Err(self.daily_exceeded(tenant_id, state, limits, today));
        }
        if state.daily_cost_used + cost > limits.daily_cost_cap {
            return Err(self.cost_exceeded(tenant_id, state, limits, today));
        }

        let (rate_allowed, current_rate) = state.rate_window.check_and_consume(now);
        if !rate_allowed {
            return Err(self.rate_exceeded(tenant_id, state, limits, today));
        }

        state.daily_requests_used += request_weight;
        state.daily_cost_used += cost;

        #[cfg(feature = "metrics")]
        metrics::counter!("quota_admissions_total", "tenant" => tenant_id.to_string(), "tier" => tier.label()).increment(1);

        Ok(QuotaInfo {
            tier,
            daily_requests_used: state.daily_requests_used,
            daily_requests_limit: limits.daily_requests,
            remaining_requests: limits.daily_requests - state.daily_requests_used,
            daily_cost_used: state.daily_cost_used,
            daily_cost_cap: limits.daily_cost_cap,
            remaining_cost: limits.daily_cost_cap - state.daily_cost_used,
            rate_per_minute: limits.rate_per_minute,
            current_rate,
            resets_at: resets_at(today),
        })
    }

    /// §4.3 `GetInfo(tenantId, tier) -> info`. Does not consume quota.
    pub fn get_info(&self, tenant_id: &str, tier: Tier) -> QuotaInfo {
        let today = Utc::now().date_naive();
        let limits = self.config.limits_for(tier);

        let mut guard = self.tenants.lock().expect("quota manager state poisoned");
        let state = guard
            .entry(tenant_id.to_string())
            .or_insert_with(|| TenantState::new(tier, limits, today));
        state.roll_if_needed(today, tier, limits);

        QuotaInfo {
            tier,
            daily_requests_used: state.daily_requests_used,
            daily_requests_limit: limits.daily_requests,
            remaining_requests: limits.daily_requests.saturating_sub(state.daily_requests_used),
            daily_cost_used: state.daily_cost_used,
            daily_cost_cap: limits.daily_cost_cap,
            remaining_cost: limits.daily_cost_cap - state.daily_cost_used,
            rate_per_minute: limits.rate_per_minute,
            current_rate: state.rate_window.len() as u32,
            resets_at: resets_at(today),
        }
    }

    /// Admin operation: updates a tenant's tier, taking effect on the next admission.
    pub fn update_tier(&self, tenant_id: &str, tier: Tier) {
        let today = Utc::now().date_naive();
        let limits = self.config.limits_for(tier);
        let mut guard = self.tenants.lock().expect("quota manager state poisoned");
        guard
            .entry(tenant_id.to_string())
            .and_modify(|state| {
                state.tier = tier;
                state.rate_window =
                    SlidingWindowCounter::new(Duration::from_secs(60), limits.rate_per_minute);
            })
            .or_insert_with(|| TenantState::new(tier, limits, today));
    }

    /// Admin operation: zeroes a tenant's daily counters and rate window.
    pub fn reset(&self, tenant_id: &str) {
        let today = Utc::now().date_naive();
        let mut guard = self.tenants.lock().expect("quota manager state poisoned");
        if let Some(state) = guard.get_mut(tenant_id) {
            let limits = self.config.limits_for(state.tier);
            state.daily_requests_used = 0;
            state.daily_cost_used = 0.0;
            state.last_reset_day = today;
            state.rate_window = SlidingWindowCounter::new(Duration::from_secs(60), limits.rate_per_minute);
        }
    }

    fn daily_exceeded(
        &self,
        tenant_id: &str,
        state: &TenantState,
        limits: TierLimits,
        today: NaiveDate,
    ) -> RouterError {
        #[cfg(feature = "tracing")]
        tracing::debug!(tenant_id, tier = state.tier.label(), "daily quota exceeded");
        let retry_after = (resets_at(today) - Utc::now())
            .to_std()
            .unwrap_or_default();
        RouterError::new(
            ErrorKind::QuotaExceeded,
            format!(
                "daily quota exceeded for tenant '{tenant_id}': {}/{}",
                state.daily_requests_used, limits.daily_requests
            ),
        )
        .with_retry_after(retry_after)
    }

    fn cost_exceeded(
        &self,
        tenant_id: &str,
        state: &TenantState,
        limits: TierLimits,
        today: NaiveDate,
    ) -> RouterError {
        #[cfg(feature = "tracing")]
        tracing::debug!(tenant_id, tier = state.tier.label(), "daily cost cap exceeded");
        let retry_after = (resets_at(today) - Utc::now())
            .to_std()
            .unwrap_or_default();
        RouterError::new(
            ErrorKind::CostCapExceeded,
            format!(
                "daily cost cap exceeded for tenant '{tenant_id}': {:.2}/{:.2}",
                state.daily_cost_used, limits.daily_cost_cap
            ),
        )
        .with_retry_after(retry_after)
    }

    fn rate_exceeded(
        &self,
        tenant_id: &str,
        state: &TenantState,
        limits: TierLimits,
        _today: NaiveDate,
    ) -> RouterError {
        #[cfg(feature = "tracing")]
        tracing::debug!(tenant_id, tier = state.tier.label(), "quota rate limit exceeded");
        RouterError::new(
            ErrorKind::RateLimitExceeded,
            format!(
                "quota rate limit exceeded for tenant '{tenant_id}': {} req/min",
                limits.rate_per_minute
            ),
        )
        .with_retry_after(Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_config() -> QuotaConfig {
        QuotaConfig::builder()
            .free(TierLimits {
                daily_requests: 2,
                daily_cost_cap: 1.0,
                rate_per_minute: 100,
            })
            .build()
    }

    #[test]
    fn admits_up_to_the_daily_ceiling_then_rejects() {
        let manager = QuotaManager::new(tiny_config());
        assert!(manager.check_and_consume("tenant-a", Tier::Free).is_ok());
        assert!(manager.check_and_consume("tenant-a", Tier::Free).is_ok());

        let err = manager
            .check_and_consume("tenant-a", Tier::Free)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::QuotaExceeded);
    }

    #[test]
    fn cost_cap_rejects_once_accumulated_cost_exceeds_budget() {
        let manager = QuotaManager::new(tiny_config());
        assert!(manager
            .check_and_consume_cost("tenant-a", Tier::Free, 1, 0.6)
            .is_ok());

        let err = manager
            .check_and_consume_cost("tenant-a", Tier::Free, 1, 0.6)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::CostCapExceeded);
    }

    #[test]
    fn tenants_are_tracked_independently() {
        let manager = QuotaManager::new(tiny_config());
        assert!(manager.check_and_consume("tenant-a", Tier::Free).is_ok());
        assert!(manager.check_and_consume("tenant-a", Tier::Free).is_ok());
        assert!(manager.check_and_consume("tenant-b", Tier::Free).is_ok());
    }

    #[test]
    fn get_info_does_not_consume_quota() {
        let manager = QuotaManager::new(tiny_config());
        let info = manager.get_info("tenant-a", Tier::Free);
        assert_eq!(info.daily_requests_used, 0);
        assert_eq!(info.remaining_requests, 2);

        assert!(manager.check_and_consume("tenant-a", Tier::Free).is_ok());
        let info = manager.get_info("tenant-a", Tier::Free);
        assert_eq!(info.daily_requests_used, 1);
    }

    #[test]
    fn admin_reset_clears_daily_usage() {
        let manager = QuotaManager::new(tiny_config());
        assert!(manager.check_and_consume("tenant-a", Tier::Free).is_ok());
        assert!(manager.check_and_consume("tenant-a", Tier::Free).is_ok());
        manager.reset("tenant-a");
        assert!(manager.check_and_consume("tenant-a", Tier::Free).is_ok());
    }

    #[test]
    fn update_tier_takes_effect_on_next_admission() {
        let manager = QuotaManager::new(tiny_config());
        manager.update_tier("tenant-a", Tier::Free);
        let info = manager.get_info("tenant-a", Tier::Free);
        assert_eq!(info.daily_requests_limit, 2);
    }
}
