use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use airouter_core::{Batch, EventListeners, Job, JobType, RouterEvent};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::config::BatcherConfig;

type FlushCallback = Arc<dyn Fn(Batch) + Send + Sync>;

struct OpenBatch {
    batch: Batch,
    callback: FlushCallback,
    timer: JoinHandle<()>,
}

/// Snapshot returned by [`Batcher::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatcherStats {
    pub open_batches: usize,
    pub pending_jobs: usize,
}

/// Owns at most one open [`Batch`] per (provider, job type) key (design doc
/// §4.5). `Add` routes a job into its batch key, creating the batch and
/// starting a single-shot timer on first insertion; the batch flushes on
/// whichever happens first, `max_batch_size` or `window`.
pub struct Batcher {
    config: BatcherConfig,
    open: Arc<Mutex<HashMap<(String, JobType), OpenBatch>>>,
    event_listeners: EventListeners<RouterEvent>,
}

impl Batcher {
    pub fn new(config: BatcherConfig) -> Self {
        Self {
            config,
            open: Arc::new(Mutex::new(HashMap::new())),
            event_listeners: EventListeners::new(),
        }
    }

    pub fn with_event_listeners(mut self, listeners: EventListeners<RouterEvent>) -> Self {
        self.event_listeners = listeners;
        self
    }

    /// §4.5 `Add(job, flushCallback) -> bool`. Returns `false` immediately
    /// in disabled mode so the caller processes `job` single, in-line.
    ///
    /// `flush` is captured once, when this job opens a new batch for its
    /// key; jobs that join an already-open batch don't replace it. Callers
    /// are expected to pass an equivalent dispatch closure on every call for
    /// a given key (e.g. "submit this batch to the worker pool").
    pub async fn add<F>(&self, job: Job, flush: F) -> bool
    where
        F: Fn(Batch) + Send + Sync + 'static,
    {
        if !self.config.enabled {
            return false;
        }

        let provider = job
            .target_provider
            .clone()
            .unwrap_or_else(|| "unassigned".to_string());
        let key = (provider.clone(), job.job_type);

        let ready = {
            let mut open = self.open.lock().expect("batcher state poisoned");
            if !open.contains_key(&key) {
                let timer = self.spawn_timer(key.clone());
                open.insert(
                    key.clone(),
                    OpenBatch {
                        batch: Batch::new(provider, job.job_type),
                        callback: Arc::new(flush),
                        timer,
                    },
                );
            }

            let entry = open.get_mut(&key).expect("just inserted if absent");
            entry.batch.push(job);

            if entry.batch.len() >= self.config.max_batch_size {
                open.remove(&key)
            } else {
                None
            }
        };

        if let Some(open_batch) = ready {
            open_batch.timer.abort();
            Self::dispatch(open_batch, &self.event_listeners);
        }

        true
    }

    /// §4.5 `ForceFlushAll(flushCallback)`. Drains every open batch
    /// (cancelling its timer) and invokes `flush` for each; a no-op when
    /// nothing is open.
    pub async fn force_flush_all<F>(&self, flush: F)
    where
        F: Fn(Batch) + Send + Sync,
    {
        let drained: Vec<OpenBatch> = {
            let mut open = self.open.lock().expect("batcher state poisoned");
            open.drain().map(|(_, v)| v).collect()
        };

        for open_batch in drained {
            open_batch.timer.abort();
            let batch = open_batch.batch;

            #[cfg(feature = "tracing")]
            tracing::debug!(provider = %batch.provider, size = batch.len(), "force-flushing batch");

            self.event_listeners.emit(&RouterEvent::BatchFlushed {
                provider: batch.provider.clone(),
                size: batch.len(),
                timestamp: Instant::now(),
            });

            flush(batch);
        }
    }

    /// §4.5 `Stats() -> snapshot`.
    pub fn stats(&self) -> BatcherStats {
        let open = self.open.lock().expect("batcher state poisoned");
        BatcherStats {
            open_batches: open.len(),
            pending_jobs: open.values().map(|entry| entry.batch.len()).sum(),
        }
    }

    fn spawn_timer(&self, key: (String, JobType)) -> JoinHandle<()> {
        let open = Arc::clone(&self.open);
        let window = self.config.window;
        let listeners = self.event_listeners.clone();

        tokio::spawn(async move {
            sleep(window).await;

            let ready = {
                let mut open = open.lock().expect("batcher state poisoned");
                open.remove(&key)
            };

            if let Some(open_batch) = ready {
                Self::dispatch(open_batch, &listeners);
            }
        })
    }

    fn dispatch(open_batch: OpenBatch, listeners: &EventListeners<RouterEvent>) {
        let batch = open_batch.batch;

        #[cfg(feature = "metrics")]
        metrics::counter!("batcher_flushed_total", "provider" => batch.provider.clone())
            .increment(1);

        #[cfg(feature = "tracing")]
        tracing::debug!(provider = %batch.provider, size = batch.len(), "flushing batch");

        listeners.emit(&RouterEvent::BatchFlushed {
            provider: batch.provider.clone(),
            size: batch.len(),
            timestamp: Instant::now(),
        });

        (open_batch.callback)(batch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airouter_core::{JobType, Priority};
    use std::collections::HashMap as Map;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn job(provider: &str, job_type: JobType) -> Job {
        let mut job = Job::new("tenant-a", "req-1", job_type, Priority::Normal, Map::new());
        job = job.with_target_provider(provider);
        job
    }

    #[tokio::test]
    async fn disabled_mode_returns_false_immediately() {
        let config = BatcherConfig::builder().enabled(false).build();
        let batcher = Batcher::new(config);
        let flushed = batcher.add(job("legal-encoder", JobType::Embedding), |_| {}).await;
        assert!(!flushed);
        assert_eq!(batcher.stats().open_batches, 0);
    }

    #[tokio::test]
    async fn flushes_when_size_threshold_reached() {
        let config = BatcherConfig::builder()
            .max_batch_size(2)
            .window(Duration::from_secs(10))
            .build();
        let batcher = Batcher::new(config);
        let flushed_sizes = Arc::new(Mutex::new(Vec::new()));

        let sizes = Arc::clone(&flushed_sizes);
        batcher
            .add(job("legal-encoder", JobType::Embedding), move |batch| {
                sizes.lock().unwrap().push(batch.len());
            })
            .await;
        assert_eq!(batcher.stats().pending_jobs, 1);

        let sizes = Arc::clone(&flushed_sizes);
        batcher
            .add(job("legal-encoder", JobType::Embedding), move |batch| {
                sizes.lock().unwrap().push(batch.len());
            })
            .await;

        assert_eq!(batcher.stats().open_batches, 0);
        assert_eq!(*flushed_sizes.lock().unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn flushes_when_window_elapses() {
        let config = BatcherConfig::builder()
            .max_batch_size(100)
            .window(Duration::from_millis(20))
            .build();
        let batcher = Arc::new(Batcher::new(config));
        let flush_count = Arc::new(AtomicUsize::new(0));

        let count = Arc::clone(&flush_count);
        batcher
            .add(job("legal-encoder", JobType::Embedding), move |_batch| {
                count.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert_eq!(flush_count.load(Ordering::SeqCst), 0);
        sleep(Duration::from_millis(60)).await;
        assert_eq!(flush_count.load(Ordering::SeqCst), 1);
        assert_eq!(batcher.stats().open_batches, 0);
    }

    #[tokio::test]
    async fn at_most_one_open_batch_per_provider_and_job_type() {
        let config = BatcherConfig::builder()
            .max_batch_size(100)
            .window(Duration::from_secs(10))
            .build();
        let batcher = Batcher::new(config);

        batcher.add(job("legal-encoder", JobType::Embedding), |_| {}).await;
        batcher.add(job("primary-chat", JobType::Inference), |_| {}).await;
        batcher.add(job("legal-encoder", JobType::Embedding), |_| {}).await;

        assert_eq!(batcher.stats().open_batches, 2);
        assert_eq!(batcher.stats().pending_jobs, 3);
    }

    #[tokio::test]
    async fn force_flush_all_is_a_no_op_on_empty_batcher() {
        let batcher = Batcher::new(BatcherConfig::default());
        let mut called = false;
        batcher.force_flush_all(|_| called = true).await;
        assert!(!called);
    }

    #[tokio::test]
    async fn force_flush_all_drains_every_open_batch() {
        let config = BatcherConfig::builder()
            .max_batch_size(100)
            .window(Duration::from_secs(10))
            .build();
        let batcher = Batcher::new(config);

        batcher.add(job("legal-encoder", JobType::Embedding), |_| {}).await;
        batcher.add(job("primary-chat", JobType::Inference), |_| {}).await;

        let flushed = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&flushed);
        batcher
            .force_flush_all(move |_batch| {
                f.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert_eq!(flushed.load(Ordering::SeqCst), 2);
        assert_eq!(batcher.stats().open_batches, 0);
    }
}
