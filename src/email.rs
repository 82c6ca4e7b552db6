//! License-delivery email: compose the message here, hand delivery to the
//! mail-relay collaborator.
//!
//! Delivery failure must never un-complete a paid sale; callers log the
//! error and move on.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::MailConfig;

const RELAY_API_URL: &str = "https://api.resend.com/emails";

/// Result of attempting to send a license email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailSendResult {
    Sent,
    /// Email delivery is disabled in the mail config
    Disabled,
    /// No mail config / no relay API key stored yet
    NotConfigured,
}

/// Everything the license-delivery template needs from a completed sale.
pub struct LicenseEmail<'a> {
    pub to_email: &'a str,
    pub customer_name: Option<&'a str>,
    pub license_key: &'a str,
    pub product_name: &'a str,
    pub license_type: &'a str,
    pub amount_cents: i64,
    pub currency: &'a str,
    pub members_url: &'a str,
}

#[derive(Debug, Serialize)]
struct RelayEmailRequest<'a> {
    from: String,
    to: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
    subject: String,
    text: String,
    html: String,
}

#[derive(Debug, Deserialize)]
struct RelayEmailResponse {
    #[allow(dead_code)]
    id: String,
}

#[derive(Clone)]
pub struct EmailService {
    http_client: Client,
}

impl Default for EmailService {
    fn default() -> Self {
        Self::new()
    }
}

impl EmailService {
    pub fn new() -> Self {
        Self {
            http_client: Client::new(),
        }
    }

    /// Send the license-delivery email through the configured relay.
    pub async fn send_license_email(
        &self,
        config: Option<&MailConfig>,
        email: &LicenseEmail<'_>,
    ) -> Result<EmailSendResult> {
        let Some(config) = config else {
            tracing::warn!("No mail config stored, skipping license email");
            return Ok(EmailSendResult::NotConfigured);
        };
        if !config.enabled {
            tracing::debug!("Email delivery disabled, skipping license email");
            return Ok(EmailSendResult::Disabled);
        }
        let Some(api_key) = config.api_key.as_deref() else {
            tracing::warn!("No relay API key stored, cannot send license email");
            return Ok(EmailSendResult::NotConfigured);
        };

        let (subject, text, html) = compose_license_email(email);
        let request = RelayEmailRequest {
            from: format!("{} <{}>", config.from_name, config.from_email),
            to: vec![email.to_email],
            reply_to: config.reply_to.as_deref(),
            subject,
            text,
            html,
        };

        let response = self
            .http_client
            .post(RELAY_API_URL)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to reach mail relay");
                AppError::Internal(format!("Email service error: {}", e))
            })?;

        if response.status().is_success() {
            let _result: RelayEmailResponse = response.json().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to parse mail relay response");
                AppError::Internal("Email service response error".into())
            })?;

            tracing::info!(to = %email.to_email, "License email sent via relay");
            Ok(EmailSendResult::Sent)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Mail relay returned error");
            Err(AppError::Internal(format!(
                "Email service error: {} - {}",
                status, body
            )))
        }
    }
}

fn format_amount(cents: i64, currency: &str) -> String {
    format!("{:.2} {}", cents as f64 / 100.0, currency.to_uppercase())
}

/// Build (subject, text, html) for the license-delivery message.
fn compose_license_email(email: &LicenseEmail<'_>) -> (String, String, String) {
    let subject = format!("Your {} License Key - Download Ready!", email.product_name);
    let greeting = match email.customer_name {
        Some(name) => format!("Hi {},", name),
        None => "Hi,".to_string(),
    };
    let amount = format_amount(email.amount_cents, email.currency);

    let text = format!(
        "{greeting}\n\n\
         Thank you for purchasing {product}!\n\n\
         Your {tier} license key:\n\n  {key}\n\n\
         Amount paid: {amount}\n\n\
         Download your package and manage activations in the members area:\n{members}\n\n\
         Keep this key safe - you need it together with this email address to\n\
         download the package and activate the module on your domain.\n",
        greeting = greeting,
        product = email.product_name,
        tier = email.license_type,
        key = email.license_key,
        amount = amount,
        members = email.members_url,
    );

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: 'Segoe UI', Tahoma, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px; color: #333;">
<h2 style="color: #333;">Thank you for your purchase!</h2>
<p>{greeting}</p>
<p>Your <strong>{tier}</strong> license for <strong>{product}</strong> is ready.</p>
<div style="background: #f5f5f5; padding: 20px; border-radius: 8px; text-align: center; margin: 24px 0;">
<code style="font-size: 20px; font-weight: bold; letter-spacing: 2px; color: #333;">{key}</code>
</div>
<p style="color: #666;">Amount paid: {amount}</p>
<p><a href="{members}">Download your package and manage activations</a></p>
<hr style="border: none; border-top: 1px solid #eee; margin: 30px 0;">
<p style="color: #999; font-size: 12px;">Keep this key safe - you need it together with this email address to download the package and activate the module on your domain.</p>
</body>
</html>"#,
        greeting = greeting,
        tier = email.license_type,
        product = email.product_name,
        key = email.license_key,
        amount = amount,
        members = email.members_url,
    );

    (subject, text, html)
}
