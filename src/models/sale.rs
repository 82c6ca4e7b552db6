use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// One purchase. The license key is generated exactly once, at creation,
/// and never changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,
    /// External checkout-session reference (payment provider)
    pub stripe_session_id: Option<String>,
    /// Payment reference, set on completion
    pub stripe_payment_id: Option<String>,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub product_id: String,
    pub license_key: String,
    pub status: SaleStatus,
    pub download_count: i32,
    pub last_download_at: Option<i64>,
    pub metadata: serde_json::Value,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SaleStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug)]
pub struct CreateSale<'a> {
    pub stripe_session_id: Option<&'a str>,
    pub stripe_payment_id: Option<&'a str>,
    pub customer_email: &'a str,
    pub customer_name: Option<&'a str>,
    pub amount_cents: i64,
    pub currency: &'a str,
    pub product_id: &'a str,
    pub status: SaleStatus,
    pub metadata: serde_json::Value,
}

/// A sale joined with its product, the shape most consumer-facing checks
/// need (tier rules, quota, entitlement payload).
#[derive(Debug, Clone, Serialize)]
pub struct SaleWithProduct {
    #[serde(flatten)]
    pub sale: Sale,
    pub product: super::Product,
}
