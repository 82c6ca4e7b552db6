use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::Result;
use crate::extractors::Json;
use crate::license::normalize_domain;
use crate::models::ActivationOutcome;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    pub license_key: String,
    pub domain: String,
}

/// Response for both outcomes. Invalid keys get `valid:false` with a generic
/// error; a domain conflict additionally reveals the activated domain, which
/// only a holder of the valid key can ever see.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidateResponse {
    fn invalid(error: &str) -> Self {
        Self {
            valid: false,
            error: Some(error.to_string()),
            activated_domain: None,
            license_key: None,
            license_type: None,
            customer_email: None,
            customer_name: None,
            product_name: None,
            purchase_date: None,
            features: None,
            domain: None,
            message: None,
        }
    }
}

/// POST /license/validate - the activation state machine.
///
/// Consumed by the purchased module at activation time. Business-rule
/// rejections are 200 responses with `valid:false`; only malformed requests
/// and storage failures become HTTP errors.
pub async fn validate_license(
    State(state): State<AppState>,
    Json(request): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>> {
    if request.license_key.is_empty() || request.domain.is_empty() {
        return Err(crate::error::AppError::BadRequest(
            "License key and domain are required".into(),
        ));
    }

    let mut conn = state.db.get()?;

    // One lookup covers "never existed" and "not completed": probing
    // clients cannot tell them apart.
    let Some(sale) = queries::get_completed_sale_by_key(&conn, &request.license_key)? else {
        return Ok(Json(ValidateResponse::invalid("Invalid license key")));
    };

    let domain = normalize_domain(&request.domain);

    let outcome = queries::activate_license(
        &mut conn,
        &request.license_key,
        &domain,
        sale.product.is_single_domain(),
    )?;

    match outcome {
        ActivationOutcome::Conflict { activated_domain } => {
            tracing::info!(
                license_key = %request.license_key,
                domain = %domain,
                activated_domain = %activated_domain,
                "Validation rejected: domain conflict"
            );
            let mut response =
                ValidateResponse::invalid("License is already activated on another domain");
            response.activated_domain = Some(activated_domain);
            Ok(Json(response))
        }
        ActivationOutcome::Activated => {
            tracing::info!(
                license_key = %request.license_key,
                domain = %domain,
                license_type = %sale.product.license_type,
                "License validated"
            );
            Ok(Json(ValidateResponse {
                valid: true,
                error: None,
                activated_domain: None,
                license_key: Some(sale.sale.license_key),
                license_type: Some(sale.product.license_type),
                customer_email: Some(sale.sale.customer_email),
                customer_name: sale.sale.customer_name,
                product_name: Some(sale.product.name),
                purchase_date: Some(sale.sale.created_at),
                features: Some(sale.product.features),
                domain: Some(domain),
                message: Some("License is valid and activated".to_string()),
            }))
        }
    }
}
