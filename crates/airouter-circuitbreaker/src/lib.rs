//! Per-provider circuit breaker (design doc §4.6).
//!
//! Each remote provider (the legal encoder, the primary chat model, the
//! alternative chat model) gets its own independent three-state breaker:
//! `closed` (normal), `open` (short-circuiting), `half_open` (probing).
//! The worker pool consults [`CircuitBreakerManager::is_available`] before
//! dispatching to a provider and reports the outcome back via
//! `record_success`/`record_failure`.
//!
//! ## Example
//!
//! ```rust
//! use airouter_circuitbreaker::{CircuitBreakerConfig, CircuitBreakerManager};
//!
//! let manager = CircuitBreakerManager::new(CircuitBreakerConfig::default());
//! if manager.is_available("legal-encoder") {
//!     // dispatch the call, then report the outcome:
//!     manager.record_success("legal-encoder");
//! }
//! ```
//!
//! ## Feature Flags
//! - `metrics`: state-transition counters and a state gauge via the `metrics` crate
//! - `tracing`: state-transition log lines via the `tracing` crate

mod circuit;
mod config;
mod error;
mod manager;

pub use circuit::CircuitState;
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::circuit_open_error;
pub use manager::CircuitBreakerManager;
