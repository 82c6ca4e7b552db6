use std::path::PathBuf;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Response;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::models::{CreateDownload, SaleWithProduct};
use crate::token::DownloadToken;
use crate::util::extract_request_info;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    pub license_key: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub download_url: String,
    pub file_name: String,
    pub file_size: i64,
    pub remaining_downloads: i32,
}

/// Package file for a tier, e.g. `crm-api-module-regular.zip`.
fn package_file(state: &AppState, license_type: &str) -> (String, PathBuf) {
    let file_name = format!("crm-api-module-{}.zip", license_type);
    let file_path = state.downloads_dir.join(&file_name);
    (file_name, file_path)
}

/// Stat the package file, mapping absence to a 404. A missing package is a
/// deployment defect, so it is also logged at error level.
async fn stat_package(file_path: &PathBuf) -> Result<i64> {
    match tokio::fs::metadata(file_path).await {
        Ok(meta) => Ok(meta.len() as i64),
        Err(e) => {
            tracing::error!(path = %file_path.display(), error = %e, "Package file missing");
            Err(AppError::NotFound("Download file not found".into()))
        }
    }
}

fn verify_download_sale(
    conn: &rusqlite::Connection,
    license_key: &str,
    email: &str,
) -> Result<SaleWithProduct> {
    queries::get_completed_sale_by_key_and_email(conn, license_key, email)?
        .ok_or(AppError::InvalidLicense)
}

/// POST /members/download - issue a time-boxed download token.
///
/// The quota is charged here, at issuance: the audit row and the counter
/// increment land before the token is handed out, so an issued-but-never-
/// redeemed token still consumed one download.
pub async fn request_download(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<DownloadRequest>,
) -> Result<Json<DownloadResponse>> {
    if request.license_key.is_empty() || request.email.is_empty() {
        return Err(AppError::BadRequest(
            "License key and email are required".into(),
        ));
    }

    let mut conn = state.db.get()?;
    let sale = verify_download_sale(&conn, &request.license_key, &request.email)?;

    let max_downloads = sale.product.download_limit;
    if sale.sale.download_count >= max_downloads {
        return Err(AppError::QuotaExceeded(max_downloads));
    }

    let (file_name, file_path) = package_file(&state, &sale.product.license_type);
    let file_size = stat_package(&file_path).await?;

    let (ip_address, user_agent) = extract_request_info(&headers);
    queries::record_download(
        &mut conn,
        &CreateDownload {
            sale_id: &sale.sale.id,
            file_name: &file_name,
            file_path: &file_path.to_string_lossy(),
            file_size,
            ip_address: ip_address.as_deref(),
            user_agent: user_agent.as_deref(),
        },
    )?;

    let token = DownloadToken::new(
        &sale.sale.license_key,
        &sale.sale.customer_email,
        Utc::now().timestamp(),
    )
    .sign(&state.download_token_secret)?;

    tracing::info!(
        license_key = %sale.sale.license_key,
        file_name = %file_name,
        "Download token issued"
    );

    Ok(Json(DownloadResponse {
        download_url: format!("/members/download/{}", token),
        file_name,
        file_size,
        remaining_downloads: max_downloads - (sale.sale.download_count + 1),
    }))
}

/// GET /members/download/{token} - redeem a token for the package bytes.
///
/// The quota was charged at issuance; redemption only re-verifies that the
/// sale is still completed (a refund in the window revokes access) and that
/// the token is authentic and fresh.
pub async fn redeem_download(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response> {
    let decoded = DownloadToken::verify(
        &token,
        &state.download_token_secret,
        Utc::now().timestamp(),
    )?;

    let conn = state.db.get()?;
    let sale = verify_download_sale(&conn, &decoded.license_key, &decoded.email)?;
    drop(conn);

    let (file_name, file_path) = package_file(&state, &sale.product.license_type);
    stat_package(&file_path).await?;

    let bytes = tokio::fs::read(&file_path).await.map_err(|e| {
        tracing::error!(path = %file_path.display(), error = %e, "Package file read failed");
        AppError::NotFound("Download file not found".into())
    })?;

    tracing::info!(
        license_key = %decoded.license_key,
        file_name = %file_name,
        "Download served"
    );

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        )
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")
        .header(header::PRAGMA, "no-cache")
        .header(header::EXPIRES, "0")
        .body(bytes.into())
        .map_err(|e| AppError::Internal(format!("Failed to build download response: {}", e)))?;

    Ok(response)
}
