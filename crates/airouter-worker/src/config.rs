use std::time::Duration;

/// Worker pool tunables (design doc §4.8).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerPoolConfig {
    /// Number of long-lived workers dequeuing concurrently.
    pub concurrency: usize,
    /// How long an idle worker sleeps between empty dequeue polls. The
    /// in-process queue's `Dequeue` is non-blocking, so workers poll rather
    /// than park on a condition variable.
    pub idle_poll_interval: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            idle_poll_interval: Duration::from_millis(10),
        }
    }
}

impl WorkerPoolConfig {
    pub fn builder() -> WorkerPoolConfigBuilder {
        WorkerPoolConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerPoolConfigBuilder {
    concurrency: Option<usize>,
    idle_poll_interval: Option<Duration>,
}

impl WorkerPoolConfigBuilder {
    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = Some(n);
        self
    }

    pub fn idle_poll_interval(mut self, interval: Duration) -> Self {
        self.idle_poll_interval = Some(interval);
        self
    }

    pub fn build(self) -> WorkerPoolConfig {
        let defaults = WorkerPoolConfig::default();
        WorkerPoolConfig {
            concurrency: self.concurrency.unwrap_or(defaults.concurrency),
            idle_poll_interval: self.idle_poll_interval.unwrap_or(defaults.idle_poll_interval),
        }
    }
}

/// Job Storage retention tunables (design doc §4.10).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageConfig {
    pub ttl_hours: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { ttl_hours: 24 }
    }
}

impl StorageConfig {
    /// Dead-letter records outlive ordinary results by 7x (design doc §4.10).
    pub fn dead_letter_ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours * 3600 * 7)
    }

    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours * 3600)
    }
}
