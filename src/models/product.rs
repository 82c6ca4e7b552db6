use serde::{Deserialize, Serialize};

/// A license tier offered for sale (e.g. "regular", "extended").
///
/// Never deleted, only deactivated: sales keep a valid product reference
/// forever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Tier tag: "regular" (single domain) or "extended" (unlimited)
    pub license_type: String,
    /// Price in minor currency units (cents)
    pub price_cents: i64,
    pub currency: String,
    /// Maximum concurrently active domains; 0 = unlimited
    pub domain_limit: i32,
    /// Lifetime download quota per sale
    pub download_limit: i32,
    /// Support window in days
    pub support_days: i32,
    /// Update-access window in days; 0 = lifetime
    pub updates_days: i32,
    /// Free-form feature flags shown in the entitlement payload
    pub features: serde_json::Value,
    pub stripe_price_id: Option<String>,
    pub active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Product {
    /// Single-domain tiers lock the key to one active domain at a time.
    pub fn is_single_domain(&self) -> bool {
        self.domain_limit == 1
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub license_type: String,
    pub price_cents: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub domain_limit: i32,
    pub download_limit: i32,
    #[serde(default)]
    pub support_days: i32,
    #[serde(default)]
    pub updates_days: i32,
    #[serde(default)]
    pub features: serde_json::Value,
    #[serde(default)]
    pub stripe_price_id: Option<String>,
}

fn default_currency() -> String {
    "usd".to_string()
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    pub domain_limit: Option<i32>,
    pub download_limit: Option<i32>,
    pub support_days: Option<i32>,
    pub updates_days: Option<i32>,
    pub features: Option<serde_json::Value>,
    pub stripe_price_id: Option<Option<String>>,
    pub active: Option<bool>,
}
