//! Composition-root error type. Every other crate in the workspace reports
//! failures through [`airouter_core::RouterError`]'s tagged-sum taxonomy;
//! this one is narrower because the only things that can go wrong here are
//! startup concerns (design doc §9: "replace exception hierarchies with a
//! tagged sum" applies just as much to the wiring step as to the dispatch
//! path it wires together).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
