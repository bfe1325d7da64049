use std::time::Duration;

/// Batching tunables (design doc §4.5). Flush happens on whichever comes
/// first: `max_batch_size` jobs accumulated, or `window` elapsed since the
/// batch's first job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatcherConfig {
    pub max_batch_size: usize,
    pub window: Duration,
    pub enabled: bool,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 10,
            window: Duration::from_millis(100),
            enabled: true,
        }
    }
}

impl BatcherConfig {
    pub fn builder() -> BatcherConfigBuilder {
        BatcherConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BatcherConfigBuilder {
    max_batch_size: Option<usize>,
    window: Option<Duration>,
    enabled: Option<bool>,
}

impl BatcherConfigBuilder {
    pub fn max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = Some(size);
        self
    }

    pub fn window(mut self, window: Duration) -> Self {
        self.window = Some(window);
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn build(self) -> BatcherConfig {
        let defaults = BatcherConfig::default();
        BatcherConfig {
            max_batch_size: self.max_batch_size.unwrap_or(defaults.max_batch_size),
            window: self.window.unwrap_or(defaults.window),
            enabled: self.enabled.unwrap_or(defaults.enabled),
        }
    }
}
