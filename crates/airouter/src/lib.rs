//! Composition root for the AI request router: loads [`config::AppConfig`],
//! builds every dispatch-core and RAG-orchestrator component, wires them
//! together in [`context::AppContext`], and exposes the `airouter` binary
//! entrypoint.
//!
//! Nothing in this crate implements dispatch, admission, or orchestration
//! logic itself — that all lives in the `airouter-*` crates it depends on.
//! This crate only answers "how do they get constructed and connected".

pub mod config;
pub mod context;
pub mod error;

pub use config::AppConfig;
pub use context::{AppContext, SubmitOutcome};
pub use error::AppError;
