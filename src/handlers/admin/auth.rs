use axum::Extension;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::crypto::verify_secret;
use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::middleware::AdminContext;
use crate::util::extract_bearer_token;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupStatusResponse {
    pub needs_setup: bool,
}

/// GET /admin/setup - does the dashboard still need its first account?
///
/// Checked against the database on every call rather than cached, so a
/// bootstrap racing a restart cannot reopen the window.
pub async fn setup_status(State(state): State<AppState>) -> Result<Json<SetupStatusResponse>> {
    let conn = state.db.get()?;
    let needs_setup = queries::count_admins(&conn)? == 0;
    Ok(Json(SetupStatusResponse { needs_setup }))
}

#[derive(Debug, Deserialize)]
pub struct SetupRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SetupResponse {
    pub success: bool,
    pub message: String,
}

/// POST /admin/setup - create the first admin account.
///
/// Open only while no admin exists; afterwards it is permanently 403.
pub async fn setup(
    State(state): State<AppState>,
    Json(request): Json<SetupRequest>,
) -> Result<Json<SetupResponse>> {
    if request.email.is_empty() || request.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".into(),
        ));
    }

    let conn = state.db.get()?;
    if queries::count_admins(&conn)? > 0 {
        return Err(AppError::Forbidden("Admin already exists".into()));
    }

    let admin = queries::create_admin(&conn, &request.email, &request.password)?;
    tracing::info!(email = %admin.email, "First admin account created");

    Ok(Json(SetupResponse {
        success: true,
        message: "Admin account created successfully".to_string(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub email: String,
}

/// POST /admin/login - exchange credentials for a bearer session token.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let conn = state.db.get()?;

    let admin = queries::get_admin_by_email(&conn, &request.email)?
        .filter(|admin| verify_secret(&request.password, &admin.password_hash))
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".into()))?;

    let token = queries::create_admin_session(&conn, &admin.id)?;
    tracing::info!(email = %admin.email, "Admin logged in");

    Ok(Json(LoginResponse {
        token,
        email: admin.email,
    }))
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// POST /admin/logout - revoke the presented session token.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>> {
    // The auth layer already validated the token, so it is present here.
    if let Some(token) = extract_bearer_token(&headers) {
        let conn = state.db.get()?;
        queries::delete_admin_session(&conn, token)?;
    }
    Ok(Json(LogoutResponse { success: true }))
}

#[derive(Debug, Serialize)]
pub struct SessionCheckResponse {
    pub user: SessionUser,
}

#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
}

/// GET /admin/session - identify the logged-in admin.
pub async fn session_check(
    Extension(ctx): Extension<AdminContext>,
) -> Result<Json<SessionCheckResponse>> {
    Ok(Json(SessionCheckResponse {
        user: SessionUser {
            id: ctx.admin.id,
            email: ctx.admin.email,
        },
    }))
}
