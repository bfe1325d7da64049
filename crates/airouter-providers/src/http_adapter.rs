//! The single concrete [`ProviderAdapter`]: a narrow `reqwest` client shaped
//! by a [`ProviderConfig`]. All three in-scope remote services (the legal
//! encoder, the primary chat model, the alternative chat model) are
//! instances of this one type with different configuration — design doc
//! §9's "no shared base behaviour beyond what the router calls" rules out a
//! class hierarchy, not a shared narrow implementation.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use airouter_core::{ErrorKind, RouterError};

use crate::adapter::ProviderAdapter;
use crate::config::ProviderConfig;
use crate::types::{
    EmbedOutcome, EmbedRequest, InferenceOutcome, InferenceRequest, SearchOutcome, SearchRequest,
};

pub struct HttpProviderAdapter {
    config: ProviderConfig,
    client: Client,
}

impl HttpProviderAdapter {
    pub fn new(config: ProviderConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("reqwest client builder with only a timeout set never fails");
        Self { config, client }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.config.base_url, path))
            .header(&self.config.auth_header_name, bearer(&self.config.api_key))
    }
}

fn bearer(api_key: &str) -> String {
    format!("Bearer {api_key}")
}

/// Maps a transport-level failure to the §7 dispatch error taxonomy.
/// Adapters never decide retryability themselves (design doc §4.9); they
/// only tag the error kind and let the retry policy (§4.7) dispatch on it.
fn classify_transport_error(error: &reqwest::Error) -> RouterError {
    let message = error.to_string();
    if error.is_timeout() {
        RouterError::new(ErrorKind::ProviderTimeout, message)
    } else if error.is_connect() {
        RouterError::new(ErrorKind::ProviderTimeout, message)
    } else {
        RouterError::new(ErrorKind::Internal, message)
    }
}

/// Maps a received HTTP status to the §7 taxonomy. 502/503/504 and 429 are
/// the only statuses the retry policy treats as retryable; everything else
/// is terminal from this adapter's point of view.
fn classify_status(status: StatusCode, body: &str) -> RouterError {
    let message = format!("provider returned {status}: {body}");
    match status.as_u16() {
        429 => RouterError::new(ErrorKind::ProviderRateLimit, message),
        502 | 503 => RouterError::new(ErrorKind::Provider5xx, message),
        504 => RouterError::new(ErrorKind::ProviderTimeout, message),
        _ if body.to_ascii_lowercase().contains("temporarily unavailable") => {
            RouterError::new(ErrorKind::Provider5xx, message)
        }
        _ => RouterError::new(ErrorKind::Internal, message),
    }
}

#[derive(Serialize)]
struct WireInferenceRequest<'a> {
    query: &'a str,
    context: &'a str,
    tenant_id: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct WireInferenceResponse {
    answer: String,
    model: String,
    #[serde(default)]
    tokens_used: u32,
}

#[derive(Serialize)]
struct WireEmbedRequest<'a> {
    doc_id: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct WireEmbedResponse {
    vector_id: String,
    dimension: usize,
    #[serde(default)]
    tokens_used: u32,
}

#[derive(Serialize)]
struct WireSearchRequest<'a> {
    query: &'a str,
    top_k: u32,
    tenant_id: &'a str,
}

#[derive(Deserialize)]
struct WireSearchResponse {
    results: Vec<serde_json::Value>,
    total_count: usize,
}

#[derive(Deserialize)]
struct WireHealthResponse {
    status: String,
}

#[async_trait]
impl ProviderAdapter for HttpProviderAdapter {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn cost_per_1k_tokens(&self) -> f64 {
        self.config.cost_per_1k_tokens
    }

    async fn inference(&self, request: &InferenceRequest) -> Result<InferenceOutcome, RouterError> {
        let response = self
            .request(reqwest::Method::POST, "/inference")
            .json(&WireInferenceRequest {
                query: &request.query,
                context: &request.context,
                tenant_id: &request.tenant_id,
                max_tokens: request.max_tokens,
                temperature: request.temperature,
            })
            .send()
            .await
            .map_err(|error| classify_transport_error(&error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            #[cfg(feature = "tracing")]
            tracing::warn!(provider = %self.config.name, %status, "inference call failed");
            return Err(classify_status(status, &body));
        }

        #[cfg(feature = "metrics")]
        metrics::counter!("provider_inference_requests_total", "provider" => self.config.name.clone()).increment(1);

        let body: WireInferenceResponse = response
            .json()
            .await
            .map_err(|error| RouterError::new(ErrorKind::Internal, error.to_string()))?;

        Ok(InferenceOutcome {
            answer: body.answer,
            model: body.model,
            tokens_used: body.tokens_used,
        })
    }

    async fn embed(&self, request: &EmbedRequest) -> Result<EmbedOutcome, RouterError> {
        let response = self
            .request(reqwest::Method::POST, "/embed")
            .json(&WireEmbedRequest {
                doc_id: &request.doc_id,
                text: &request.text,
            })
            .send()
            .await
            .map_err(|error| classify_transport_error(&error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        #[cfg(feature = "metrics")]
        metrics::counter!("provider_embed_requests_total", "provider" => self.config.name.clone()).increment(1);

        let body: WireEmbedResponse = response
            .json()
            .await
            .map_err(|error| RouterError::new(ErrorKind::Internal, error.to_string()))?;

        Ok(EmbedOutcome {
            vector_id: body.vector_id,
            dimension: body.dimension,
            tokens_used: body.tokens_used,
        })
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome, RouterError> {
        let response = self
            .request(reqwest::Method::POST, "/search")
            .json(&WireSearchRequest {
                query: &request.query,
                top_k: request.top_k,
                tenant_id: &request.tenant_id,
            })
            .send()
            .await
            .map_err(|error| classify_transport_error(&error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let body: WireSearchResponse = response
            .json()
            .await
            .map_err(|error| RouterError::new(ErrorKind::Internal, error.to_string()))?;

        Ok(SearchOutcome {
            results: body.results,
            total_count: body.total_count,
        })
    }

    async fn health_check(&self) -> Result<bool, RouterError> {
        let response = self
            .request(reqwest::Method::GET, "/health")
            .send()
            .await
            .map_err(|error| classify_transport_error(&error))?;

        if !response.status().is_success() {
            return Ok(false);
        }

        let body: WireHealthResponse = response
            .json()
            .await
            .map_err(|error| RouterError::new(ErrorKind::Internal, error.to_string()))?;

        Ok(body.status == "healthy" || body.status == "ok")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_429_as_retryable_rate_limit() {
        let error = classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert_eq!(error.kind, ErrorKind::ProviderRateLimit);
        assert!(error.is_retryable());
    }

    #[test]
    fn classifies_503_as_retryable_5xx() {
        let error = classify_status(StatusCode::SERVICE_UNAVAILABLE, "down for maintenance");
        assert_eq!(error.kind, ErrorKind::Provider5xx);
        assert!(error.is_retryable());
    }

    #[test]
    fn classifies_504_as_retryable_timeout() {
        let error = classify_status(StatusCode::GATEWAY_TIMEOUT, "upstream timeout");
        assert_eq!(error.kind, ErrorKind::ProviderTimeout);
        assert!(error.is_retryable());
    }

    #[test]
    fn classifies_explicit_temporarily_unavailable_body_as_retryable() {
        let error = classify_status(StatusCode::OK, "Service temporarily unavailable, try later");
        assert_eq!(error.kind, ErrorKind::Provider5xx);
        assert!(error.is_retryable());
    }

    #[test]
    fn classifies_400_as_terminal() {
        let error = classify_status(StatusCode::BAD_REQUEST, "bad payload");
        assert_eq!(error.kind, ErrorKind::Internal);
        assert!(!error.is_retryable());
    }
}
