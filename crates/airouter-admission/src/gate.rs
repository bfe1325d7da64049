use std::collections::HashMap;
use std::sync::Arc;

use airouter_core::{ErrorKind, RequestContext, RouterError};
use airouter_quota::QuotaManager;
use airouter_ratelimiter::RateLimiter;
use jsonwebtoken::{decode, errors::ErrorKind as JwtErrorKind, DecodingKey, Validation};

use crate::claims::Claims;
use crate::revocation::RevocationStore;

/// Bearer credential verification, scope enforcement, and rate/quota wiring
/// for a single incoming request (design doc §4.1).
///
/// Consults the rate limiter before the quota manager, matching the
/// admission order the rest of the pipeline assumes.
pub struct AdmissionGate {
    decoding_key: DecodingKey,
    validation: Validation,
    revocation: Arc<dyn RevocationStore>,
    rate_limiter: Arc<RateLimiter>,
    quota_manager: Arc<QuotaManager>,
    required_scopes: HashMap<String, String>,
}

impl AdmissionGate {
    pub fn new(
        secret: &[u8],
        revocation: Arc<dyn RevocationStore>,
        rate_limiter: Arc<RateLimiter>,
        quota_manager: Arc<QuotaManager>,
    ) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::new(jsonwebtoken::Algorithm::HS256),
            revocation,
            rate_limiter,
            quota_manager,
            required_scopes: HashMap::new(),
        }
    }

    /// Registers the scope required to call `endpoint`. Endpoints with no
    /// registered requirement admit any authenticated caller.
    pub fn require_scope(&mut self, endpoint: impl Into<String>, scope: impl Into<String>) {
        self.required_scopes.insert(endpoint.into(), scope.into());
    }

    /// §4.1 `Admit(request) -> (tenantId, scopes) or rejection`.
    ///
    /// `authorization_header` is the raw `Authorization` header value.
    /// `client_request_id` is honoured from an `X-Request-ID` header when
    /// present; otherwise a fresh id is minted.
    pub fn admit(
        &self,
        authorization_header: Option<&str>,
        endpoint: &str,
        client_request_id: Option<String>,
    ) -> Result<RequestContext, RouterError> {
        let token = extract_bearer_token(authorization_header)?;
        let claims = self.verify(token)?;

        if self.revocation.is_revoked(&claims.jti) {
            return Err(RouterError::new(
                ErrorKind::TokenRevoked,
                "credential has been revoked",
            ));
        }

        if let Some(required) = self.required_scopes.get(endpoint) {
            if !claims.has_scope(required) {
                return Err(RouterError::new(
                    ErrorKind::ScopeInsufficient,
                    format!("endpoint '{endpoint}' requires scope '{required}'"),
                ));
            }
        }

        self.rate_limiter
            .check_and_consume(&claims.tenant_id, endpoint)?;
        self.quota_manager
            .check_and_consume(&claims.tenant_id, claims.tier())?;

        #[cfg(feature = "metrics")]
        metrics::counter!("admission_accepted_total", "endpoint" => endpoint.to_string()).increment(1);

        Ok(RequestContext::new(
            claims.tenant_id,
            claims.scopes,
            client_request_id,
        ))
    }

    fn verify(&self, token: &str) -> Result<Claims, RouterError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| {
                #[cfg(feature = "tracing")]
                tracing::debug!(error = %err, "credential verification failed");

                let kind = match err.kind() {
                    JwtErrorKind::ExpiredSignature => ErrorKind::TokenExpired,
                    JwtErrorKind::InvalidSignature => ErrorKind::SignatureInvalid,
                    _ => ErrorKind::TokenInvalid,
                };
                RouterError::new(kind, format!("invalid credential: {err}"))
            })
    }
}

fn extract_bearer_token(header: Option<&str>) -> Result<&str, RouterError> {
    let header = header.ok_or_else(|| {
        RouterError::new(ErrorKind::TokenMissing, "missing Authorization header")
    })?;

    let mut parts = header.splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(RouterError::new(
            ErrorKind::TokenInvalid,
            "Authorization header must be 'Bearer <token>'",
        ));
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revocation::InMemoryRevocationStore;
    use airouter_quota::QuotaConfig;
    use airouter_ratelimiter::RateLimiterConfig;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &[u8] = b"test-secret";

    fn token_for(tenant_id: &str, scopes: Vec<String>, tier: &str) -> String {
        let claims = Claims {
            tenant_id: tenant_id.to_string(),
            scopes,
            tier: tier.to_string(),
            exp: (Utc::now().timestamp()) + 3600,
            iat: Utc::now().timestamp(),
            jti: "jti-1".to_string(),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    fn gate() -> AdmissionGate {
        let mut gate = AdmissionGate::new(
            SECRET,
            Arc::new(InMemoryRevocationStore::new()),
            Arc::new(RateLimiter::new(RateLimiterConfig::default())),
            Arc::new(QuotaManager::new(QuotaConfig::default())),
        );
        gate.require_scope("/inference", "inference:write");
        gate
    }

    #[test]
    fn missing_header_is_rejected() {
        let gate = gate();
        let err = gate.admit(None, "/inference", None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenMissing);
    }

    #[test]
    fn malformed_header_is_rejected() {
        let gate = gate();
        let err = gate
            .admit(Some("not-a-bearer-token"), "/inference", None)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenInvalid);
    }

    #[test]
    fn insufficient_scope_is_rejected() {
        let gate = gate();
        let token = token_for("tenant-a", vec!["embed:read".to_string()], "basic");
        let err = gate
            .admit(Some(&format!("Bearer {token}")), "/inference", None)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ScopeInsufficient);
    }

    #[test]
    fn valid_token_with_required_scope_is_admitted() {
        let gate = gate();
        let token = token_for("tenant-a", vec!["inference:write".to_string()], "pro");
        let ctx = gate
            .admit(Some(&format!("Bearer {token}")), "/inference", None)
            .unwrap();
        assert_eq!(ctx.tenant_id(), "tenant-a");
    }

    #[test]
    fn revoked_token_is_rejected() {
        let revocation = Arc::new(InMemoryRevocationStore::new());
        revocation.revoke("jti-1");
        let mut gate = AdmissionGate::new(
            SECRET,
            revocation,
            Arc::new(RateLimiter::new(RateLimiterConfig::default())),
            Arc::new(QuotaManager::new(QuotaConfig::default())),
        );
        gate.require_scope("/inference", "inference:write");

        let token = token_for("tenant-a", vec!["inference:write".to_string()], "basic");
        let err = gate
            .admit(Some(&format!("Bearer {token}")), "/inference", None)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenRevoked);
    }
}
