//! Priority job queue with an idempotency interlock (design doc §4.4).
//!
//! Jobs are pulled in order of (priority rank descending, enqueue sequence
//! ascending). Two interchangeable backends implement [`QueueBackend`]: the
//! default [`InProcessQueue`] and, behind the `redis-backend` feature,
//! [`RedisQueue`] — a sorted-set backend with identical ordering semantics.
//!
//! ## Feature Flags
//! - `redis-backend`: shared-key-value backend via the `redis` crate
//! - `metrics`: enqueue counters via the `metrics` crate
//! - `tracing`: capacity/rejection log lines via the `tracing` crate

mod backend;
mod idempotency;
mod in_process;
mod queue;

#[cfg(feature = "redis-backend")]
mod redis_backend;

pub use backend::QueueBackend;
pub use in_process::InProcessQueue;
pub use queue::{EnqueueOutcome, PriorityQueue};

#[cfg(feature = "redis-backend")]
pub use redis_backend::RedisQueue;
