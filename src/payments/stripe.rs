use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::models::StripeConfig;

type HmacSha256 = Hmac<Sha256>;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Accepted clock skew between Stripe's signature timestamp and ours.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    webhook_secret: Option<String>,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Result<Self> {
        let secret_key = config
            .secret_key
            .clone()
            .ok_or_else(|| AppError::BadRequest("Stripe is not configured".into()))?;
        Ok(Self {
            client: Client::new(),
            secret_key,
            webhook_secret: config.webhook_secret.clone(),
        })
    }

    /// Create a hosted-checkout session for one product and return
    /// (session id, checkout url).
    pub async fn create_checkout_session(
        &self,
        price_id: &str,
        customer_email: &str,
        license_type: &str,
        product_name: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<(String, String)> {
        let form: Vec<(&str, &str)> = vec![
            ("mode", "payment"),
            ("payment_method_types[0]", "card"),
            ("line_items[0][price]", price_id),
            ("line_items[0][quantity]", "1"),
            ("customer_email", customer_email),
            ("success_url", success_url),
            ("cancel_url", cancel_url),
            ("metadata[license_type]", license_type),
            ("metadata[product]", product_name),
        ];

        let response = self
            .client
            .post(format!("{}/checkout/sessions", STRIPE_API_BASE))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Stripe API error: {}",
                error_text
            )));
        }

        let session: StripeCheckoutSession = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse Stripe response: {}", e)))?;

        let url = session
            .url
            .ok_or_else(|| AppError::Internal("Stripe session has no checkout URL".into()))?;
        Ok((session.id, url))
    }

    /// Retrieve a checkout session for the synchronous status poll.
    pub async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<StripeCheckoutSession> {
        let response = self
            .client
            .get(format!(
                "{}/checkout/sessions/{}",
                STRIPE_API_BASE, session_id
            ))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Stripe API error: {}",
                error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse Stripe response: {}", e)))
    }

    /// Verify a `Stripe-Signature` header against the raw payload.
    ///
    /// Header format: `t=<unix>,v1=<hex hmac>,...`. The MAC covers
    /// `"{t}.{payload}"`. An unauthenticated notification must be rejected,
    /// never processed.
    pub fn verify_webhook_signature(&self, payload: &[u8], signature_header: &str) -> Result<bool> {
        let webhook_secret = self
            .webhook_secret
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("Stripe webhook secret not configured".into()))?;

        verify_stripe_signature(
            webhook_secret,
            payload,
            signature_header,
            Utc::now().timestamp(),
        )
    }
}

/// Signature check split out so the timestamp can be pinned in tests.
pub fn verify_stripe_signature(
    webhook_secret: &str,
    payload: &[u8],
    signature_header: &str,
    now: i64,
) -> Result<bool> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<Vec<u8>> = Vec::new();

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse().ok(),
            Some(("v1", v)) => {
                if let Ok(mac) = hex::decode(v) {
                    candidates.push(mac);
                }
            }
            _ => {}
        }
    }

    let Some(timestamp) = timestamp else {
        return Ok(false);
    };
    if candidates.is_empty() {
        return Ok(false);
    }
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Ok(false);
    }

    let mut mac = HmacSha256::new_from_slice(webhook_secret.as_bytes())
        .map_err(|_| AppError::Internal("Invalid webhook secret".into()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = mac.finalize().into_bytes();

    Ok(candidates
        .iter()
        .any(|candidate| expected.ct_eq(candidate.as_slice()).unwrap_u8() == 1))
}

#[derive(Debug, Deserialize)]
pub struct StripeWebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_details: Option<StripeCustomerDetails>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl StripeCheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }

    pub fn email(&self) -> Option<&str> {
        self.customer_email
            .as_deref()
            .or_else(|| self.customer_details.as_ref().and_then(|d| d.email.as_deref()))
    }

    pub fn customer_name(&self) -> Option<&str> {
        self.customer_details.as_ref().and_then(|d| d.name.as_deref())
    }
}

#[derive(Debug, Deserialize)]
pub struct StripeCustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StripePaymentIntent {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct StripeCharge {
    pub id: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub refunded: bool,
}
