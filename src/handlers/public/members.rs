use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::models::Download;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRequest {
    pub license_key: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    pub license_key: String,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub product: MemberProduct,
    pub purchase_date: i64,
    pub download_count: i32,
    pub last_download_at: Option<i64>,
    pub recent_downloads: Vec<Download>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberProduct {
    pub name: String,
    pub license_type: String,
    pub features: serde_json::Value,
}

const RECENT_DOWNLOAD_LIMIT: i64 = 10;

/// POST /members/verify - the members-area gate.
///
/// Requires the license key AND the purchasing email; a valid key alone is
/// not enough to see the purchase record.
pub async fn verify_member(
    State(state): State<AppState>,
    Json(request): Json<MemberRequest>,
) -> Result<Json<MemberResponse>> {
    if request.license_key.is_empty() || request.email.is_empty() {
        return Err(AppError::BadRequest(
            "License key and email are required".into(),
        ));
    }

    let conn = state.db.get()?;

    let sale =
        queries::get_completed_sale_by_key_and_email(&conn, &request.license_key, &request.email)?
            .ok_or(AppError::InvalidLicense)?;

    let recent_downloads =
        queries::list_recent_downloads_for_sale(&conn, &sale.sale.id, RECENT_DOWNLOAD_LIMIT)?;

    Ok(Json(MemberResponse {
        license_key: sale.sale.license_key,
        customer_email: sale.sale.customer_email,
        customer_name: sale.sale.customer_name,
        product: MemberProduct {
            name: sale.product.name,
            license_type: sale.product.license_type,
            features: sale.product.features,
        },
        purchase_date: sale.sale.created_at,
        download_count: sale.sale.download_count,
        last_download_at: sale.sale.last_download_at,
        recent_downloads,
    }))
}
