//! Per-tenant, tier-based daily quota and cost-cap accounting (design doc §4.3).
//!
//! Tracks two things per tenant: a daily request (or cost) ceiling that
//! resets lazily at midnight UTC, and a per-minute rate window reusing
//! [`airouter_core::SlidingWindowCounter`]. The admission gate consults this
//! after the rate limiter, in that order.
//!
//! ## Example
//!
//! ```rust
//! use airouter_quota::{QuotaConfig, QuotaManager, Tier};
//!
//! let manager = QuotaManager::new(QuotaConfig::default());
//! match manager.check_and_consume("tenant-a", Tier::Free) {
//!     Ok(info) => println!("admitted, {} requests remaining today", info.remaining_requests),
//!     Err(err) => println!("rejected: {err}"),
//! }
//! ```
//!
//! ## Feature Flags
//! - `metrics`: admission counters via the `metrics` crate
//! - `tracing`: rejection log lines via the `tracing` crate

mod config;
mod manager;

pub use config::{QuotaConfig, QuotaConfigBuilder, Tier, TierLimits};
pub use manager::{QuotaInfo, QuotaManager};
