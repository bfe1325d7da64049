//! The error taxonomy shared across the router (spec §7).
//!
//! Every fallible operation in this workspace returns [`RouterError`] (or a
//! crate-local error that converts into one at the boundary). The retry
//! policy dispatches on [`ErrorKind::is_retryable`] exclusively — no string
//! matching on messages in production code paths. [`ErrorKind::legacy_from_message`]
//! exists only as a fallback for errors that reach the edge of the system
//! untagged (e.g. a raw `reqwest::Error` before a provider adapter classifies it).

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Machine-readable error code, verbatim what the (out-of-scope) HTTP error
/// envelope would surface as `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    // Credential (401)
    TokenMissing,
    TokenInvalid,
    TokenExpired,
    TokenRevoked,
    SignatureInvalid,
    // Authorization (403)
    ScopeInsufficient,
    TenantMismatch,
    // Admission (429)
    RateLimitExceeded,
    QuotaExceeded,
    CostCapExceeded,
    // Validation (400)
    ClaimMissing,
    ClaimInvalid,
    PayloadTooLarge,
    InvalidParameter,
    // Dispatch (502/503/504)
    ProviderTimeout,
    Provider5xx,
    ProviderRateLimit,
    // Exhaustion (502)
    AllProvidersFailed,
    DeadLetter,
    // Orchestration (422)
    PromptInjectionDetected,
    HallucinationSuspected,
    RetrievalEmpty,
    // Catch-all for storage/infra failures that aren't part of the named taxonomy.
    Internal,
}

impl ErrorKind {
    /// The machine code exactly as it would appear in the error envelope.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::TokenMissing => "TOKEN_MISSING",
            ErrorKind::TokenInvalid => "TOKEN_INVALID",
            ErrorKind::TokenExpired => "TOKEN_EXPIRED",
            ErrorKind::TokenRevoked => "TOKEN_REVOKED",
            ErrorKind::SignatureInvalid => "SIGNATURE_INVALID",
            ErrorKind::ScopeInsufficient => "SCOPE_INSUFFICIENT",
            ErrorKind::TenantMismatch => "TENANT_MISMATCH",
            ErrorKind::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ErrorKind::QuotaExceeded => "QUOTA_EXCEEDED",
            ErrorKind::CostCapExceeded => "COST_CAP_EXCEEDED",
            ErrorKind::ClaimMissing => "CLAIM_MISSING",
            ErrorKind::ClaimInvalid => "CLAIM_INVALID",
            ErrorKind::PayloadTooLarge => "payload_too_large",
            ErrorKind::InvalidParameter => "invalid_parameter",
            ErrorKind::ProviderTimeout => "provider_timeout",
            ErrorKind::Provider5xx => "provider_5xx",
            ErrorKind::ProviderRateLimit => "provider_rate_limit",
            ErrorKind::AllProvidersFailed => "all_providers_failed",
            ErrorKind::DeadLetter => "dead_letter",
            ErrorKind::PromptInjectionDetected => "prompt_injection_detected",
            ErrorKind::HallucinationSuspected => "hallucination_suspected",
            ErrorKind::RetrievalEmpty => "retrieval_empty",
            ErrorKind::Internal => "internal_error",
        }
    }

    /// The HTTP status the (out-of-scope) HTTP layer would map this to.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::TokenMissing
            | ErrorKind::TokenInvalid
            | ErrorKind::TokenExpired
            | ErrorKind::TokenRevoked
            | ErrorKind::SignatureInvalid => 401,
            ErrorKind::ScopeInsufficient | ErrorKind::TenantMismatch => 403,
            ErrorKind::RateLimitExceeded | ErrorKind::QuotaExceeded | ErrorKind::CostCapExceeded => {
                429
            }
            ErrorKind::ClaimMissing
            | ErrorKind::ClaimInvalid
            | ErrorKind::PayloadTooLarge
            | ErrorKind::InvalidParameter => 400,
            ErrorKind::ProviderTimeout => 504,
            ErrorKind::Provider5xx => 502,
            ErrorKind::ProviderRateLimit => 503,
            ErrorKind::AllProvidersFailed | ErrorKind::DeadLetter => 502,
            ErrorKind::PromptInjectionDetected
            | ErrorKind::HallucinationSuspected
            | ErrorKind::RetrievalEmpty => 422,
            ErrorKind::Internal => 500,
        }
    }

    /// §4.7: is this error one the retry policy should retry?
    ///
    /// Retryable iff: connection timeout, connect refused/reset, remote
    /// 502/503/504, remote 429, or an explicit provider "temporarily
    /// unavailable". Everything else is terminal.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::ProviderTimeout | ErrorKind::Provider5xx | ErrorKind::ProviderRateLimit
        )
    }

    /// Fallback classifier for untagged errors (e.g. raw transport errors
    /// that reach the edge before a provider adapter tags them). Production
    /// code paths must never rely on this; it exists only so a provider
    /// adapter bug doesn't silently swallow a retryable condition.
    pub fn legacy_from_message(message: &str) -> Option<ErrorKind> {
        let lower = message.to_ascii_lowercase();
        const RETRYABLE_PATTERNS: &[(&str, ErrorKind)] = &[
            ("timed out", ErrorKind::ProviderTimeout),
            ("timeout", ErrorKind::ProviderTimeout),
            ("connection reset", ErrorKind::ProviderTimeout),
            ("connection refused", ErrorKind::ProviderTimeout),
            ("temporarily unavailable", ErrorKind::Provider5xx),
            ("502", ErrorKind::Provider5xx),
            ("503", ErrorKind::Provider5xx),
            ("504", ErrorKind::ProviderTimeout),
            ("429", ErrorKind::ProviderRateLimit),
            ("too many requests", ErrorKind::ProviderRateLimit),
            ("rate limit", ErrorKind::ProviderRateLimit),
        ];
        RETRYABLE_PATTERNS
            .iter()
            .find(|(pattern, _)| lower.contains(pattern))
            .map(|(_, kind)| *kind)
    }
}

/// The error type returned by every fallible operation in this workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterError {
    pub kind: ErrorKind,
    pub message: String,
    /// Present only for `RateLimitExceeded`/`QuotaExceeded`-class errors, so
    /// clients can honour `Retry-After`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<Duration>,
}

impl RouterError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.code(), self.message)
    }
}

impl std::error::Error for RouterError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification_matches_table() {
        assert!(ErrorKind::ProviderTimeout.is_retryable());
        assert!(ErrorKind::Provider5xx.is_retryable());
        assert!(ErrorKind::ProviderRateLimit.is_retryable());
        assert!(!ErrorKind::TokenInvalid.is_retryable());
        assert!(!ErrorKind::AllProvidersFailed.is_retryable());
        assert!(!ErrorKind::PromptInjectionDetected.is_retryable());
    }

    #[test]
    fn http_status_mapping() {
        assert_eq!(ErrorKind::TokenExpired.http_status(), 401);
        assert_eq!(ErrorKind::QuotaExceeded.http_status(), 429);
        assert_eq!(ErrorKind::RetrievalEmpty.http_status(), 422);
    }

    #[test]
    fn legacy_classifier_is_a_fallback_only() {
        assert_eq!(
            ErrorKind::legacy_from_message("connection reset by peer"),
            Some(ErrorKind::ProviderTimeout)
        );
        assert_eq!(ErrorKind::legacy_from_message("invalid json"), None);
    }

    #[test]
    fn display_includes_code_and_message() {
        let err = RouterError::new(ErrorKind::TokenExpired, "exp in the past");
        assert_eq!(err.to_string(), "TOKEN_EXPIRED: exp in the past");
    }
}
