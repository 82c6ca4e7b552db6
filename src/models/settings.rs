use serde::{Deserialize, Serialize};

/// Placeholder returned instead of a stored secret. A PUT carrying this
/// value means "keep the stored secret".
pub const MASKED_SECRET: &str = "********";

/// Stripe connection settings, stored as a single row and edited from the
/// admin API. Secret fields are masked on every read path after the initial
/// write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeConfig {
    pub publishable_key: Option<String>,
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub regular_price_id: Option<String>,
    pub extended_price_id: Option<String>,
    pub live_mode: bool,
    pub updated_at: i64,
}

impl StripeConfig {
    pub fn is_configured(&self) -> bool {
        self.secret_key.is_some()
    }

    /// Copy with secrets replaced by the mask, for admin read paths.
    pub fn masked(&self) -> Self {
        Self {
            secret_key: self.secret_key.as_ref().map(|_| MASKED_SECRET.to_string()),
            webhook_secret: self
                .webhook_secret
                .as_ref()
                .map(|_| MASKED_SECRET.to_string()),
            ..self.clone()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStripeConfig {
    #[serde(default)]
    pub publishable_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub webhook_secret: Option<String>,
    #[serde(default)]
    pub regular_price_id: Option<String>,
    #[serde(default)]
    pub extended_price_id: Option<String>,
    #[serde(default)]
    pub live_mode: Option<bool>,
}

/// Outbound email (mail relay) settings, stored as a single row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub api_key: Option<String>,
    pub from_email: String,
    pub from_name: String,
    pub reply_to: Option<String>,
    pub enabled: bool,
    pub updated_at: i64,
}

impl MailConfig {
    pub fn masked(&self) -> Self {
        Self {
            api_key: self.api_key.as_ref().map(|_| MASKED_SECRET.to_string()),
            ..self.clone()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateMailConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    pub from_email: String,
    pub from_name: String,
    #[serde(default)]
    pub reply_to: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}
