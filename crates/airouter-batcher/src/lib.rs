//! Micro-batcher (design doc §4.5).
//!
//! Groups compatible pending jobs (same provider, same job type) into
//! batches that flush on whichever happens first: `max_batch_size` jobs
//! accumulated, or `window` elapsed since the batch's first job. Disabled
//! mode returns `false` immediately so the caller falls back to processing
//! single jobs in-line.
//!
//! ## Example
//!
//! ```rust
//! use airouter_batcher::{Batcher, BatcherConfig};
//! use airouter_core::{Job, JobType, Priority};
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let batcher = Arc::new(Batcher::new(BatcherConfig::default()));
//! let job = Job::new("tenant-a", "req-1", JobType::Embedding, Priority::Normal, HashMap::new());
//! batcher
//!     .add(job, |batch| {
//!         // flush callback: dispatch `batch` to the worker pool
//!         let _ = batch;
//!     })
//!     .await;
//! # }
//! ```
//!
//! ## Feature Flags
//! - `metrics`: batch size/flush counters via the `metrics` crate
//! - `tracing`: flush log lines via the `tracing` crate

mod batcher;
mod config;

pub use batcher::{Batcher, BatcherStats};
pub use config::{BatcherConfig, BatcherConfigBuilder};
