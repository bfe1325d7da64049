//! Shared infrastructure for the AI request router.
//!
//! This crate provides the types every other `airouter-*` crate builds on:
//! - the [`Job`]/[`JobResult`] data model (§3 of the design doc)
//! - the [`RouterError`] tagged-sum error taxonomy (§7)
//! - the [`events`] system used by admission, queue, circuit breaker, and retry
//!   for observability
//! - [`context::RequestContext`], threaded through admission → queue → worker
//!   → provider call
//! - [`window::SlidingWindowCounter`], the count-evicting sliding window
//!   shared by the rate limiter and the quota manager

pub mod context;
pub mod error;
pub mod events;
pub mod job;
pub mod window;

pub use context::RequestContext;
pub use error::{ErrorKind, RouterError};
pub use events::{EventListener, EventListeners, FnListener, RouterEvent, RouterEventTrait};
pub use job::{
    Batch, DeadLetterRecord, Job, JobOutcome, JobPayload, JobResult, JobStatus, JobType, Priority,
};
pub use window::SlidingWindowCounter;
