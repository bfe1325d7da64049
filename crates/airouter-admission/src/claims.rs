use airouter_quota::Tier;
use serde::{Deserialize, Serialize};

/// Claims carried by the internal bearer credential (design doc §4.1).
///
/// `tier` defaults to `basic` when absent so that a credential minted before
/// quota tiers existed still verifies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Tenant identifier, enforced against any tenant scoping in the request.
    pub tenant_id: String,
    /// Granted scopes, checked against the target endpoint's required scope.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Quota tier, defaults to `basic`.
    #[serde(default = "default_tier_label")]
    pub tier: String,
    /// Expiration, unix seconds (verified by `jsonwebtoken`).
    pub exp: i64,
    /// Issued-at, unix seconds.
    #[serde(default)]
    pub iat: i64,
    /// JWT ID, checked against the revocation store.
    #[serde(default)]
    pub jti: String,
}

fn default_tier_label() -> String {
    "basic".to_string()
}

impl Claims {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    pub fn tier(&self) -> Tier {
        match self.tier.as_str() {
            "free" => Tier::Free,
            "pro" => Tier::Pro,
            "enterprise" => Tier::Enterprise,
            _ => Tier::Basic,
        }
    }
}
