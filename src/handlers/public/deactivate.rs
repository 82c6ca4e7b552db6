use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::license::normalize_domain;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeactivateRequest {
    pub license_key: String,
    pub domain: String,
}

#[derive(Debug, Serialize)]
pub struct DeactivateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// POST /license/deactivate - frees a single-domain license to move.
///
/// A regular-tier customer must call this for domain A before a validation
/// from domain B can succeed.
pub async fn deactivate_license(
    State(state): State<AppState>,
    Json(request): Json<DeactivateRequest>,
) -> Result<Json<DeactivateResponse>> {
    if request.license_key.is_empty() || request.domain.is_empty() {
        return Err(AppError::BadRequest(
            "License key and domain are required".into(),
        ));
    }

    let conn = state.db.get()?;

    if queries::get_completed_sale_by_key(&conn, &request.license_key)?.is_none() {
        return Ok(Json(DeactivateResponse {
            success: false,
            message: None,
            error: Some("Invalid license key".to_string()),
            domain: None,
        }));
    }

    let domain = normalize_domain(&request.domain);

    if !queries::deactivate_domain(&conn, &request.license_key, &domain)? {
        return Ok(Json(DeactivateResponse {
            success: false,
            message: None,
            error: Some("License not found for this domain".to_string()),
            domain: None,
        }));
    }

    tracing::info!(
        license_key = %request.license_key,
        domain = %domain,
        "License deactivated"
    );

    Ok(Json(DeactivateResponse {
        success: true,
        message: Some("License deactivated successfully".to_string()),
        error: None,
        domain: Some(domain),
    }))
}
