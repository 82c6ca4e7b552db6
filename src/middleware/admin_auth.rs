use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::db::{AppState, queries};
use crate::models::AdminUser;
use crate::util::extract_bearer_token;

#[derive(Clone)]
pub struct AdminContext {
    pub admin: AdminUser,
}

/// Authenticate an admin from the bearer session token.
fn authenticate_admin(state: &AppState, headers: &HeaderMap) -> Result<AdminUser, StatusCode> {
    let token = extract_bearer_token(headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    queries::get_admin_by_session_token(&conn, token)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)
}

pub async fn admin_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let admin = authenticate_admin(&state, request.headers())?;
    request.extensions_mut().insert(AdminContext { admin });
    Ok(next.run(request).await)
}
