//! Exponential-backoff retry policy (design doc §4.7).
//!
//! Wraps a single provider call: up to `max_attempts` invocations, sleeping
//! `min(initial_delay * base^attempt, max_delay)` between them, jittered by
//! a uniform factor in `[0.75, 1.25]`. An error's retryability is decided
//! exclusively by [`airouter_core::ErrorKind::is_retryable`] — never by
//! matching on the error's message.
//!
//! ## Example
//!
//! ```rust
//! use airouter_retry::{RetryConfig, RetryPolicy};
//! use airouter_core::{ErrorKind, RouterError};
//!
//! # async fn example() {
//! let policy = RetryPolicy::new(RetryConfig::default());
//! let result: Result<&str, RouterError> = policy
//!     .execute(|_attempt| async { Ok("inference result") })
//!     .await;
//! # }
//! ```

mod backoff;
mod config;
mod policy;

pub use config::{RetryConfig, RetryConfigBuilder};
pub use policy::RetryPolicy;
