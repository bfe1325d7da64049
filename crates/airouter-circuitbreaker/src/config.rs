use std::time::Duration;

/// Tunables for a single provider's circuit breaker (design doc §4.6).
///
/// Defaults match the upstream dispatch core's retry/circuit-breaker
/// configuration: five consecutive failures trip the breaker, two
/// consecutive half-open successes close it again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub timeout: Duration,
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout: Duration::from_secs(60),
            half_open_max_calls: 3,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfigOverrides,
}

#[derive(Debug, Clone, Copy, Default)]
struct CircuitBreakerConfigOverrides {
    failure_threshold: Option<u32>,
    success_threshold: Option<u32>,
    timeout: Option<Duration>,
    half_open_max_calls: Option<u32>,
}

impl CircuitBreakerConfigBuilder {
    pub fn failure_threshold(mut self, n: u32) -> Self {
        self.config.failure_threshold = Some(n);
        self
    }

    pub fn success_threshold(mut self, n: u32) -> Self {
        self.config.success_threshold = Some(n);
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.config.timeout = Some(duration);
        self
    }

    pub fn half_open_max_calls(mut self, n: u32) -> Self {
        self.config.half_open_max_calls = Some(n);
        self
    }

    pub fn build(self) -> CircuitBreakerConfig {
        let defaults = CircuitBreakerConfig::default();
        CircuitBreakerConfig {
            failure_threshold: self.config.failure_threshold.unwrap_or(defaults.failure_threshold),
            success_threshold: self.config.success_threshold.unwrap_or(defaults.success_threshold),
            timeout: self.config.timeout.unwrap_or(defaults.timeout),
            half_open_max_calls: self
                .config
                .half_open_max_calls
                .unwrap_or(defaults.half_open_max_calls),
        }
    }
}
