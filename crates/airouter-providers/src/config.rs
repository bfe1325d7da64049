use std::time::Duration;

/// Everything that distinguishes one provider's HTTP adapter from another
/// (design doc §4.9: "the URL, the request schema... the authentication
/// header name"). Request/response schemas themselves live in
/// [`crate::http_adapter::HttpProviderAdapter`]'s wire-format structs since
/// all three remote services in scope share the same narrow shape.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub name: String,
    pub base_url: String,
    pub auth_header_name: String,
    pub api_key: String,
    pub timeout: Duration,
    /// §9 open question: externalized, not a hard-coded constant.
    pub cost_per_1k_tokens: f64,
}

impl ProviderConfig {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            auth_header_name: "Authorization".to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
            cost_per_1k_tokens: 0.0002,
        }
    }

    pub fn with_auth_header_name(mut self, header: impl Into<String>) -> Self {
        self.auth_header_name = header.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cost_per_1k_tokens(mut self, cost: f64) -> Self {
        self.cost_per_1k_tokens = cost;
        self
    }
}
