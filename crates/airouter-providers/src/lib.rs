//! Provider adapters and the provider preference router (design doc §4.9).
//!
//! A [`ProviderAdapter`] is a fixed capability set — inference, embedding,
//! search, health check — backed by a narrow HTTP client. The only
//! implementation shipped here is [`HttpProviderAdapter`], configured per
//! remote service through [`ProviderConfig`]; there are three configured
//! instances in a typical deployment (the legal encoder, the primary chat
//! model, the alternative chat model), not three Rust types.
//!
//! [`ProviderRouter`] holds the configured fallback order. It does not retry
//! or consult a circuit breaker itself — that orchestration belongs to the
//! worker pool, which is the only caller that needs both the ordered list
//! and the retry/circuit-breaker machinery at once.
//!
//! ```
//! use std::sync::Arc;
//! use airouter_providers::{HttpProviderAdapter, ProviderConfig, ProviderRouter};
//!
//! let legal_encoder = HttpProviderAdapter::new(ProviderConfig::new(
//!     "legal-encoder",
//!     "https://legal-encoder.internal",
//!     "secret",
//! ));
//! let router = ProviderRouter::new(vec![Arc::new(legal_encoder)]);
//! assert_eq!(router.len(), 1);
//! ```

mod adapter;
mod config;
mod http_adapter;
mod router;
mod types;

pub use adapter::ProviderAdapter;
pub use config::ProviderConfig;
pub use http_adapter::HttpProviderAdapter;
pub use router::ProviderRouter;
pub use types::{
    EmbedOutcome, EmbedRequest, InferenceOutcome, InferenceRequest, SearchOutcome, SearchRequest,
};
