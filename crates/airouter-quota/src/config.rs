/// Daily request ceiling, daily cost cap, and per-minute limit for a single
/// tier (design doc §4.3, §9 tier defaults).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierLimits {
    pub daily_requests: u64,
    pub daily_cost_cap: f64,
    pub rate_per_minute: u32,
}

/// Quota tier, selected at admission time. Tier changes take effect on the
/// next admission rather than retroactively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Free,
    Basic,
    Pro,
    Enterprise,
}

impl Tier {
    pub fn label(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Basic => "basic",
            Tier::Pro => "pro",
            Tier::Enterprise => "enterprise",
        }
    }
}

/// Tier table consulted by the quota manager. Defaults match the reference
/// tier limits: free 100/day, basic 1000/day, pro 10000/day, enterprise
/// 100000/day, with per-minute rates of 10/60/300/1000 respectively.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotaConfig {
    pub free: TierLimits,
    pub basic: TierLimits,
    pub pro: TierLimits,
    pub enterprise: TierLimits,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            free: TierLimits {
                daily_requests: 100,
                daily_cost_cap: 5.0,
                rate_per_minute: 10,
            },
            basic: TierLimits {
                daily_requests: 1_000,
                daily_cost_cap: 50.0,
                rate_per_minute: 60,
            },
            pro: TierLimits {
                daily_requests: 10_000,
                daily_cost_cap: 500.0,
                rate_per_minute: 300,
            },
            enterprise: TierLimits {
                daily_requests: 100_000,
                daily_cost_cap: 5_000.0,
                rate_per_minute: 1_000,
            },
        }
    }
}

impl QuotaConfig {
    pub fn limits_for(&self, tier: Tier) -> TierLimits {
        match tier {
            Tier::Free => self.free,
            Tier::Basic => self.basic,
            Tier::Pro => self.pro,
            Tier::Enterprise => self.enterprise,
        }
    }

    pub fn builder() -> QuotaConfigBuilder {
        QuotaConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QuotaConfigBuilder {
    free: Option<TierLimits>,
    basic: Option<TierLimits>,
    pro: Option<TierLimits>,
    enterprise: Option<TierLimits>,
}

impl QuotaConfigBuilder {
    pub fn free(mut self, limits: TierLimits) -> Self {
        self.free = Some(limits);
        self
    }

    pub fn basic(mut self, limits: TierLimits) -> Self {
        self.basic = Some(limits);
        self
    }

    pub fn pro(mut self, limits: TierLimits) -> Self {
        self.pro = Some(limits);
        self
    }

    pub fn enterprise(mut self, limits: TierLimits) -> Self {
        self.enterprise = Some(limits);
        self
    }

    pub fn build(self) -> QuotaConfig {
        let defaults = QuotaConfig::default();
        QuotaConfig {
            free: self.free.unwrap_or(defaults.free),
            basic: self.basic.unwrap_or(defaults.basic),
            pro: self.pro.unwrap_or(defaults.pro),
            enterprise: self.enterprise.unwrap_or(defaults.enterprise),
        }
    }
}
