//! Application configuration (design doc §6's enumeration), loaded from a
//! layered `config`-crate source (optional `airouter.toml` file, then
//! `AIROUTER__*` environment variables, double-underscore-nested) with
//! `dotenvy` populating the process environment from a `.env` file first —
//! the same file-then-env layering `knhk-config` uses, adapted from
//! TOML-via-`toml` to the `config` crate's own file/env sources.
//!
//! Each section converts into the concrete `*Config` type its crate expects;
//! durations are modeled as plain seconds/millis fields here because the
//! `config` crate's environment source has no notion of `std::time::Duration`.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use airouter_batcher::BatcherConfig;
use airouter_circuitbreaker::CircuitBreakerConfig;
use airouter_providers::ProviderConfig as AdapterConfig;
use airouter_quota::{QuotaConfig, TierLimits};
use airouter_ratelimiter::RateLimiterConfig;
use airouter_rag::RagConfig;
use airouter_retry::RetryConfig;
use airouter_worker::{StorageConfig, WorkerPoolConfig};

use crate::error::AppError;

/// The three providers this workspace dispatches to (design doc §1): a
/// legal-domain encoder (embeddings), and two general-purpose chat models
/// (inference/search), the second serving as the first's fallback.
pub const LEGAL_ENCODER: &str = "legal_encoder";
pub const CHAT_PRIMARY: &str = "chat_primary";
pub const CHAT_ALTERNATIVE: &str = "chat_alternative";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    pub base_url: String,
    pub api_key: String,
    pub auth_header_name: String,
    pub timeout_seconds: u64,
    pub cost_per_1k_tokens: f64,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            auth_header_name: "Authorization".to_string(),
            timeout_seconds: 30,
            cost_per_1k_tokens: 0.0002,
        }
    }
}

impl ProviderSection {
    fn into_adapter_config(self, name: &str) -> AdapterConfig {
        AdapterConfig::new(name, self.base_url, self.api_key)
            .with_auth_header_name(self.auth_header_name)
            .with_timeout(Duration::from_secs(self.timeout_seconds))
            .with_cost_per_1k_tokens(self.cost_per_1k_tokens)
    }
}

/// Provider list (design doc §6: "Provider list: `primary`, comma-separated
/// `fallback`") plus the per-provider connection settings the router needs
/// to actually reach them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProvidersSection {
    /// Name of the provider inference/search jobs try first. Must be one of
    /// `legal_encoder`, `chat_primary`, `chat_alternative` (or a name added
    /// to `extra`).
    pub primary: String,
    /// Comma-separated fallback names, tried in order after `primary`.
    pub fallback: String,
    pub legal_encoder: ProviderSection,
    pub chat_primary: ProviderSection,
    pub chat_alternative: ProviderSection,
}

impl Default for ProvidersSection {
    fn default() -> Self {
        Self {
            primary: CHAT_PRIMARY.to_string(),
            fallback: CHAT_ALTERNATIVE.to_string(),
            legal_encoder: ProviderSection::default(),
            chat_primary: ProviderSection::default(),
            chat_alternative: ProviderSection::default(),
        }
    }
}

impl ProvidersSection {
    fn named_sections(&self) -> HashMap<&'static str, ProviderSection> {
        let mut map = HashMap::new();
        map.insert(LEGAL_ENCODER, self.legal_encoder.clone());
        map.insert(CHAT_PRIMARY, self.chat_primary.clone());
        map.insert(CHAT_ALTERNATIVE, self.chat_alternative.clone());
        map
    }

    /// The chat-model fallback order: `primary` followed by `fallback`'s
    /// comma-separated names, used for inference/search jobs.
    pub fn chat_order(&self) -> Vec<String> {
        let mut order = vec![self.primary.clone()];
        order.extend(
            self.fallback
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        );
        order
    }

    /// Adapter configs keyed by provider name, for every name this workspace
    /// knows about.
    pub fn adapter_configs(&self) -> HashMap<String, AdapterConfig> {
        self.named_sections()
            .into_iter()
            .map(|(name, section)| (name.to_string(), section.into_adapter_config(name)))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct QueueSection {
    pub max_size: usize,
    pub ttl_hours: u64,
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            max_size: 10_000,
            ttl_hours: 24,
        }
    }
}

impl QueueSection {
    fn storage_config(self) -> StorageConfig {
        StorageConfig {
            ttl_hours: self.ttl_hours,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct BatcherSection {
    pub max_size: usize,
    pub window_ms: u64,
    pub enabled: bool,
}

impl Default for BatcherSection {
    fn default() -> Self {
        let defaults = BatcherConfig::default();
        Self {
            max_size: defaults.max_batch_size,
            window_ms: defaults.window.as_millis() as u64,
            enabled: defaults.enabled,
        }
    }
}

impl From<BatcherSection> for BatcherConfig {
    fn from(section: BatcherSection) -> Self {
        BatcherConfig::builder()
            .max_batch_size(section.max_size)
            .window(Duration::from_millis(section.window_ms))
            .enabled(section.enabled)
            .build()
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSection {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub timeout_seconds: u64,
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerSection {
    fn default() -> Self {
        let defaults = CircuitBreakerConfig::default();
        Self {
            failure_threshold: defaults.failure_threshold,
            success_threshold: defaults.success_threshold,
            timeout_seconds: defaults.timeout.as_secs(),
            half_open_max_calls: defaults.half_open_max_calls,
        }
    }
}

impl From<CircuitBreakerSection> for CircuitBreakerConfig {
    fn from(section: CircuitBreakerSection) -> Self {
        CircuitBreakerConfig::builder()
            .failure_threshold(section.failure_threshold)
            .success_threshold(section.success_threshold)
            .timeout(Duration::from_secs(section.timeout_seconds))
            .half_open_max_calls(section.half_open_max_calls)
            .build()
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub initial_delay_seconds: f64,
    pub max_delay_seconds: f64,
    pub exponential_base: f64,
    pub jitter: bool,
}

impl Default for RetrySection {
    fn default() -> Self {
        let defaults = RetryConfig::default();
        Self {
            max_attempts: defaults.max_attempts,
            initial_delay_seconds: defaults.initial_delay.as_secs_f64(),
            max_delay_seconds: defaults.max_delay.as_secs_f64(),
            exponential_base: defaults.exponential_base,
            jitter: defaults.jitter,
        }
    }
}

impl From<RetrySection> for RetryConfig {
    fn from(section: RetrySection) -> Self {
        RetryConfig::builder()
            .max_attempts(section.max_attempts)
            .initial_delay(Duration::from_secs_f64(section.initial_delay_seconds))
            .max_delay(Duration::from_secs_f64(section.max_delay_seconds))
            .exponential_base(section.exponential_base)
            .jitter(section.jitter)
            .build()
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct TierSection {
    pub daily_requests: u64,
    pub daily_cost_cap: f64,
    pub rate_per_minute: u32,
    pub burst_capacity: u32,
}

impl TierSection {
    fn from_defaults(limits: TierLimits, burst_capacity: u32) -> Self {
        Self {
            daily_requests: limits.daily_requests,
            daily_cost_cap: limits.daily_cost_cap,
            rate_per_minute: limits.rate_per_minute,
            burst_capacity,
        }
    }

    fn tier_limits(self) -> TierLimits {
        TierLimits {
            daily_requests: self.daily_requests,
            daily_cost_cap: self.daily_cost_cap,
            rate_per_minute: self.rate_per_minute,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct QuotaSection {
    pub free: TierSection,
    pub basic: TierSection,
    pub pro: TierSection,
    pub enterprise: TierSection,
}

impl Default for QuotaSection {
    fn default() -> Self {
        let defaults = QuotaConfig::default();
        Self {
            free: TierSection::from_defaults(defaults.free, 5),
            basic: TierSection::from_defaults(defaults.basic, 15),
            pro: TierSection::from_defaults(defaults.pro, 50),
            enterprise: TierSection::from_defaults(defaults.enterprise, 200),
        }
    }
}

impl QuotaSection {
    fn quota_config(self) -> QuotaConfig {
        QuotaConfig::builder()
            .free(self.free.tier_limits())
            .basic(self.basic.tier_limits())
            .pro(self.pro.tier_limits())
            .enterprise(self.enterprise.tier_limits())
            .build()
    }

    /// The per-minute + burst rate limiter config for a tier's endpoint
    /// traffic; the quota manager owns the daily ceiling, the rate limiter
    /// owns the per-minute/burst enforcement (design doc §4.2 vs §4.3).
    fn rate_limiter_config(self, tier: TierSection) -> RateLimiterConfig {
        RateLimiterConfig::builder()
            .per_minute_limit(tier.rate_per_minute)
            .burst_limit(tier.burst_capacity)
            .build()
    }

    pub fn rate_limiter_config_for_enterprise_burst(&self) -> RateLimiterConfig {
        // The rate limiter is shared across tiers at the gate; the widest
        // tier's burst/per-minute ceiling is used as the limiter's own
        // config, and the quota manager still enforces the tighter
        // per-tier daily ceiling independently.
        self.rate_limiter_config(self.enterprise)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerSection {
    pub concurrency: usize,
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self {
            concurrency: WorkerPoolConfig::default().concurrency,
        }
    }
}

impl From<WorkerSection> for WorkerPoolConfig {
    fn from(section: WorkerSection) -> Self {
        WorkerPoolConfig::builder()
            .concurrency(section.concurrency)
            .build()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RagSection {
    pub max_context_tokens: u32,
    pub chars_per_token: f32,
    pub include_metadata: bool,
    pub template_directory: String,
    pub redact_pii: bool,
}

impl Default for RagSection {
    fn default() -> Self {
        let defaults = RagConfig::default();
        Self {
            max_context_tokens: defaults.max_context_tokens,
            chars_per_token: defaults.chars_per_token,
            include_metadata: defaults.include_metadata,
            template_directory: "templates".to_string(),
            redact_pii: defaults.redact_pii,
        }
    }
}

impl From<RagSection> for RagConfig {
    fn from(section: RagSection) -> Self {
        RagConfig::builder()
            .max_context_tokens(section.max_context_tokens)
            .chars_per_token(section.chars_per_token)
            .include_metadata(section.include_metadata)
            .redact_pii(section.redact_pii)
            .build()
    }
}

/// Top-level application configuration (design doc §6). `jwt_secret` signs
/// and verifies the bearer credential the admission gate checks; it has no
/// safe default and must come from the environment or a secret store in any
/// real deployment (see design doc §1's "secret store" collaborator).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub providers: ProvidersSection,
    pub queue: QueueSection,
    pub batcher: BatcherSection,
    pub circuit_breaker: CircuitBreakerSection,
    pub retry: RetrySection,
    pub quota: QuotaSection,
    pub worker: WorkerSection,
    pub rag: RagSection,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            providers: ProvidersSection::default(),
            queue: QueueSection::default(),
            batcher: BatcherSection::default(),
            circuit_breaker: CircuitBreakerSection::default(),
            retry: RetrySection::default(),
            quota: QuotaSection::default(),
            worker: WorkerSection::default(),
            rag: RagSection::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from (lowest to highest precedence): compiled-in
    /// defaults, an optional `airouter.toml` in the working directory, and
    /// `AIROUTER__*` environment variables (double-underscore nested, e.g.
    /// `AIROUTER__RETRY__MAX_ATTEMPTS=5`). Does not itself read `.env`; call
    /// [`dotenvy::dotenv`] before this if a `.env` file should populate the
    /// process environment first (the binary entrypoint does this; library
    /// callers that construct their own environment should not have it done
    /// for them implicitly).
    pub fn load() -> Result<Self, AppError> {
        let raw = config::Config::builder()
            .add_source(config::File::with_name("airouter").required(false))
            .add_source(config::Environment::with_prefix("AIROUTER").separator("__"))
            .build()?;

        raw.try_deserialize().map_err(AppError::from)
    }

    pub fn storage_config(&self) -> StorageConfig {
        self.queue.storage_config()
    }

    pub fn batcher_config(&self) -> BatcherConfig {
        self.batcher.into()
    }

    pub fn circuit_breaker_config(&self) -> CircuitBreakerConfig {
        self.circuit_breaker.into()
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry.into()
    }

    pub fn quota_config(&self) -> QuotaConfig {
        self.quota.quota_config()
    }

    pub fn rate_limiter_config(&self) -> RateLimiterConfig {
        self.quota.rate_limiter_config_for_enterprise_burst()
    }

    pub fn worker_pool_config(&self) -> WorkerPoolConfig {
        self.worker.clone().into()
    }

    pub fn rag_config(&self) -> RagConfig {
        self.rag.clone().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_into_component_configs() {
        let config = AppConfig::default();
        assert_eq!(config.providers.chat_order(), vec![CHAT_PRIMARY, CHAT_ALTERNATIVE]);
        assert_eq!(config.retry_config().max_attempts, RetryConfig::default().max_attempts);
        assert_eq!(
            config.circuit_breaker_config().failure_threshold,
            CircuitBreakerConfig::default().failure_threshold
        );
    }

    #[test]
    fn chat_order_splits_comma_separated_fallback_and_trims_whitespace() {
        let mut providers = ProvidersSection::default();
        providers.primary = "chat_primary".to_string();
        providers.fallback = " chat_alternative , legal_encoder".to_string();
        assert_eq!(
            providers.chat_order(),
            vec!["chat_primary", "chat_alternative", "legal_encoder"]
        );
    }

    #[test]
    fn adapter_configs_cover_all_three_fixed_providers() {
        let providers = ProvidersSection::default();
        let configs = providers.adapter_configs();
        assert!(configs.contains_key(LEGAL_ENCODER));
        assert!(configs.contains_key(CHAT_PRIMARY));
        assert!(configs.contains_key(CHAT_ALTERNATIVE));
    }
}
