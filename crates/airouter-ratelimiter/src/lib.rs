//! Per-tenant, per-endpoint sliding-window rate limiter (design doc §4.2).
//!
//! The admission gate consults this before the quota manager on every
//! request. Each (tenant, endpoint) pair is tracked independently across
//! two windows: the per-minute limit and a shorter burst window.
//!
//! ## Example
//!
//! ```rust
//! use airouter_ratelimiter::{RateLimiter, RateLimiterConfig};
//!
//! let limiter = RateLimiter::new(RateLimiterConfig::default());
//! match limiter.check_and_consume("tenant-a", "/inference") {
//!     Ok(info) => println!("admitted, {} remaining", info.remaining),
//!     Err(err) => println!("rejected: {err}"),
//! }
//! ```
//!
//! ## Feature Flags
//! - `metrics`: admission/rejection counters via the `metrics` crate
//! - `tracing`: rejection log lines via the `tracing` crate

mod config;
mod limiter;

pub use config::{RateLimiterConfig, RateLimiterConfigBuilder};
pub use limiter::{RateLimitInfo, RateLimiter};
