mod auth;
mod config;
mod products;
mod sales;

pub use auth::*;
pub use config::*;
pub use products::*;
pub use sales::*;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::db::AppState;
use crate::middleware::admin_auth;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/logout", post(logout))
        .route("/admin/session", get(session_check))
        .route("/admin/sales", get(sales_report))
        .route("/admin/sales/{id}/refund", post(refund_sale))
        .route("/admin/products", get(list_products))
        .route("/admin/products", post(create_product))
        .route("/admin/products/{id}", put(update_product))
        .route("/admin/products/{id}", delete(deactivate_product))
        .route("/admin/config/stripe", get(get_stripe_config))
        .route("/admin/config/stripe", put(update_stripe_config))
        .route("/admin/config/email", get(get_mail_config))
        .route("/admin/config/email", put(update_mail_config))
        .route("/admin/config/email", delete(delete_mail_config))
        .layer(middleware::from_fn_with_state(state, admin_auth))
        // Bootstrap and login live outside the session gate.
        .route("/admin/setup", get(setup_status))
        .route("/admin/setup", post(setup))
        .route("/admin/login", post(login))
}
