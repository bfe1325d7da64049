//! Admission gate: bearer credential verification, scope enforcement, and
//! rate-limit/quota wiring (design doc §4.1).
//!
//! Verifies the bearer credential's signature, expiration, and revocation
//! status; extracts the tenant identifier, scope set, and quota tier;
//! enforces the endpoint's required scope; then consults the rate limiter
//! and quota manager, in that order.
//!
//! ## Feature Flags
//! - `metrics`: admission accept counters via the `metrics` crate
//! - `tracing`: verification failure log lines via the `tracing` crate

mod claims;
mod gate;
mod revocation;

pub use claims::Claims;
pub use gate::AdmissionGate;
pub use revocation::{InMemoryRevocationStore, RevocationStore};
