use axum::extract::State;
use serde::Serialize;

use crate::db::{AppState, queries};
use crate::error::Result;
use crate::extractors::Json;
use crate::models::{MailConfig, StripeConfig, UpdateMailConfig, UpdateStripeConfig};

#[derive(Debug, Serialize)]
pub struct StripeConfigResponse {
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<StripeConfig>,
}

/// GET /admin/config/stripe - stored settings with secrets masked.
pub async fn get_stripe_config(State(state): State<AppState>) -> Result<Json<StripeConfigResponse>> {
    let conn = state.db.get()?;
    let config = queries::get_stripe_config(&conn)?;
    Ok(Json(StripeConfigResponse {
        configured: config.as_ref().is_some_and(|c| c.is_configured()),
        config: config.map(|c| c.masked()),
    }))
}

/// PUT /admin/config/stripe - upsert settings.
///
/// A secret field carrying the mask placeholder keeps the stored value, so
/// the dashboard can round-trip the masked GET response unchanged.
pub async fn update_stripe_config(
    State(state): State<AppState>,
    Json(input): Json<UpdateStripeConfig>,
) -> Result<Json<StripeConfigResponse>> {
    let conn = state.db.get()?;
    let config = queries::upsert_stripe_config(&conn, &input)?;
    tracing::info!(live_mode = config.live_mode, "Stripe config updated");
    Ok(Json(StripeConfigResponse {
        configured: config.is_configured(),
        config: Some(config.masked()),
    }))
}

#[derive(Debug, Serialize)]
pub struct MailConfigResponse {
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<MailConfig>,
}

/// GET /admin/config/email - stored settings with the API key masked.
pub async fn get_mail_config(State(state): State<AppState>) -> Result<Json<MailConfigResponse>> {
    let conn = state.db.get()?;
    let config = queries::get_mail_config(&conn)?;
    Ok(Json(MailConfigResponse {
        configured: config.is_some(),
        config: config.map(|c| c.masked()),
    }))
}

/// PUT /admin/config/email - upsert settings, mask-aware like Stripe's.
pub async fn update_mail_config(
    State(state): State<AppState>,
    Json(input): Json<UpdateMailConfig>,
) -> Result<Json<MailConfigResponse>> {
    let conn = state.db.get()?;
    let config = queries::upsert_mail_config(&conn, &input)?;
    tracing::info!(from = %config.from_email, enabled = config.enabled, "Mail config updated");
    Ok(Json(MailConfigResponse {
        configured: true,
        config: Some(config.masked()),
    }))
}

#[derive(Debug, Serialize)]
pub struct DeleteMailConfigResponse {
    pub success: bool,
}

/// DELETE /admin/config/email - drop the stored settings entirely.
pub async fn delete_mail_config(
    State(state): State<AppState>,
) -> Result<Json<DeleteMailConfigResponse>> {
    let conn = state.db.get()?;
    let deleted = queries::delete_mail_config(&conn)?;
    if deleted {
        tracing::info!("Mail config deleted");
    }
    Ok(Json(DeleteMailConfigResponse { success: deleted }))
}
