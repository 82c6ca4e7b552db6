mod checkout;
mod deactivate;
mod download;
mod members;
mod validate;

pub use checkout::*;
pub use deactivate::*;
pub use download::*;
pub use members::*;
pub use validate::*;

use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::Serialize;

use crate::db::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/checkout", post(create_checkout))
        .route("/checkout/status", get(checkout_status))
        .route("/license/validate", post(validate_license))
        .route("/license/deactivate", post(deactivate_license))
        .route("/members/verify", post(verify_member))
        .route("/members/download", post(request_download))
        .route("/members/download/{token}", get(redeem_download))
}
