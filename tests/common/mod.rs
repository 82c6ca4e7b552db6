//! Shared helpers for the integration tests: scratch databases, seeded
//! products and sales, and request plumbing.

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use rusqlite::params;
use serde_json::{Value, json};
use tempfile::TempDir;

use keyfront::db::{AppState, init_pool, queries};
use keyfront::email::EmailService;
use keyfront::models::{CreateProduct, CreateSale, Product, Sale, SaleStatus};

pub const TEST_TOKEN_SECRET: &str = "test-download-token-secret";
pub const TEST_KEY: &str = "PFX-AAAA-BBBB-CCCC-DDDD";
pub const TEST_EMAIL: &str = "buyer@example.com";

/// Fresh state over a scratch database. Keep the returned TempDir alive for
/// the duration of the test; dropping it removes the database file.
pub fn create_test_state() -> (AppState, TempDir) {
    let dir = TempDir::new().expect("create temp dir");
    let db_path = dir.path().join("test.db");
    let pool = init_pool(db_path.to_str().expect("utf-8 path")).expect("init pool");

    let state = AppState {
        db: pool,
        email: EmailService::new(),
        base_url: "http://localhost:3000".to_string(),
        downloads_dir: dir.path().join("downloads"),
        download_token_secret: TEST_TOKEN_SECRET.to_string(),
        license_key_prefix: "PFX".to_string(),
    };
    (state, dir)
}

pub fn test_app(state: &AppState) -> Router {
    keyfront::app(state.clone())
}

/// Seed the two standard tiers: regular (single domain, 10 downloads) and
/// extended (unlimited domains, 50 downloads).
pub fn seed_products(conn: &rusqlite::Connection) -> (Product, Product) {
    let regular = queries::create_product(
        conn,
        &CreateProduct {
            name: "CRM API Module".into(),
            description: Some("Regular license".into()),
            license_type: "regular".into(),
            price_cents: 4900,
            currency: "usd".into(),
            domain_limit: 1,
            download_limit: 10,
            support_days: 180,
            updates_days: 365,
            features: json!(["api", "webhooks"]),
            stripe_price_id: Some("price_regular".into()),
        },
    )
    .expect("seed regular product");

    let extended = queries::create_product(
        conn,
        &CreateProduct {
            name: "CRM API Module".into(),
            description: Some("Extended license".into()),
            license_type: "extended".into(),
            price_cents: 19900,
            currency: "usd".into(),
            domain_limit: 0,
            download_limit: 50,
            support_days: 365,
            updates_days: 0,
            features: json!(["api", "webhooks", "priority-support"]),
            stripe_price_id: Some("price_extended".into()),
        },
    )
    .expect("seed extended product");

    (regular, extended)
}

/// Completed sale with a pinned license key.
pub fn seed_completed_sale(
    conn: &rusqlite::Connection,
    product: &Product,
    license_key: &str,
    email: &str,
) -> Sale {
    let sale = queries::create_sale(
        conn,
        &CreateSale {
            stripe_session_id: Some(&format!("cs_test_{}", license_key)),
            stripe_payment_id: Some(&format!("pi_test_{}", license_key)),
            customer_email: email,
            customer_name: Some("Test Buyer"),
            amount_cents: product.price_cents,
            currency: &product.currency,
            product_id: &product.id,
            status: SaleStatus::Completed,
            metadata: json!({}),
        },
        "PFX",
    )
    .expect("seed sale");

    conn.execute(
        "UPDATE sales SET license_key = ?1 WHERE id = ?2",
        params![license_key, &sale.id],
    )
    .expect("pin license key");

    queries::get_sale_by_id(conn, &sale.id)
        .expect("reload sale")
        .expect("sale exists")
}

/// Pending sale awaiting payment confirmation.
pub fn seed_pending_sale(
    conn: &rusqlite::Connection,
    product: &Product,
    session_id: &str,
    email: &str,
) -> Sale {
    queries::create_sale(
        conn,
        &CreateSale {
            stripe_session_id: Some(session_id),
            stripe_payment_id: None,
            customer_email: email,
            customer_name: None,
            amount_cents: product.price_cents,
            currency: &product.currency,
            product_id: &product.id,
            status: SaleStatus::Pending,
            metadata: json!({}),
        },
        "PFX",
    )
    .expect("seed pending sale")
}

/// Create an admin account and return a live session token.
pub fn seed_admin(conn: &rusqlite::Connection) -> String {
    let admin = queries::create_admin(conn, "admin@example.com", "correct horse")
        .expect("seed admin");
    queries::create_admin_session(conn, &admin.id).expect("seed session")
}

/// Drop the package file for a tier into the state's downloads directory.
pub fn write_package_file(state: &AppState, license_type: &str, contents: &[u8]) {
    std::fs::create_dir_all(&state.downloads_dir).expect("create downloads dir");
    let path = state
        .downloads_dir
        .join(format!("crm-api-module-{}.zip", license_type));
    std::fs::write(path, contents).expect("write package file");
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request")
}

pub fn authed_request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token));
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("build request")
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request")
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("body is JSON")
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body")
        .to_vec()
}

pub fn assert_status(response: &Response<Body>, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}
