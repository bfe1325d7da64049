//! The worker pool, job storage, and dead-letter queue (design doc §4.8,
//! §4.10).
//!
//! [`WorkerPool`] is the only place the circuit breaker, retry policy, and
//! provider router meet: it dequeues from a [`airouter_queue::PriorityQueue`],
//! dispatches through [`dispatch_job`] (breaker check, retry-wrapped provider
//! call under a per-attempt deadline, fallback to the next provider on
//! terminal failure), and persists the outcome through [`JobStorage`].
//!
//! ## Feature Flags
//! - `metrics`: forwarded to the circuit breaker, retry, and queue crates
//! - `tracing`: forwarded to the circuit breaker, retry, and queue crates

mod config;
mod dispatch;
mod pool;
mod storage;

pub use config::{StorageConfig, WorkerPoolConfig, WorkerPoolConfigBuilder};
pub use dispatch::{dispatch_job, DispatchFailure, DispatchOutcome};
pub use pool::WorkerPool;
pub use storage::JobStorage;
