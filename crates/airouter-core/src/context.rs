//! Per-request context propagated from admission through to the provider
//! call and back.

use std::fmt;

use uuid::Uuid;

/// Identity and tracing information threaded through admission, the queue,
/// the worker pool, and the provider router.
///
/// Constructed once by the Admission Gate (either honouring a client-supplied
/// `X-Request-ID` or minting a fresh one) and passed by value or cheap clone
/// through every downstream call; nothing here is mutated after construction.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    tenant_id: String,
    scopes: Vec<String>,
    #[cfg(feature = "tracing")]
    span: tracing::Span,
}

impl RequestContext {
    /// Builds a context, honouring a client-supplied request id if present.
    pub fn new(tenant_id: impl Into<String>, scopes: Vec<String>, request_id: Option<String>) -> Self {
        let request_id = request_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let tenant_id = tenant_id.into();

        #[cfg(feature = "tracing")]
        let span = tracing::info_span!("request", request_id = %request_id, tenant_id = %tenant_id);

        Self {
            request_id,
            tenant_id,
            scopes,
            #[cfg(feature = "tracing")]
            span,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    #[cfg(feature = "tracing")]
    pub fn span(&self) -> &tracing::Span {
        &self.span
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.request_id, self.tenant_id)
    }
}
