use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::{Value, json};
use sha2::Sha256;
use tower::ServiceExt;

use crate::common::*;
use keyfront::db::queries;
use keyfront::models::{SaleStatus, UpdateStripeConfig};

const WEBHOOK_SECRET: &str = "whsec_test_secret";

fn seed_stripe_config(conn: &rusqlite::Connection) {
    queries::upsert_stripe_config(
        conn,
        &UpdateStripeConfig {
            publishable_key: Some("pk_test".into()),
            secret_key: Some("sk_test".into()),
            webhook_secret: Some(WEBHOOK_SECRET.into()),
            regular_price_id: Some("price_regular".into()),
            extended_price_id: Some("price_extended".into()),
            live_mode: Some(false),
        },
    )
    .expect("seed stripe config");
}

fn signature_header(payload: &str) -> String {
    let timestamp = Utc::now().timestamp();
    let mut mac =
        Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).expect("hmac key");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

fn webhook_request(payload: &str, signature: Option<&str>) -> Request<Body> {
    let builder = Request::builder()
        .method("POST")
        .uri("/webhook/stripe")
        .header("content-type", "application/json");
    let builder = match signature {
        Some(sig) => builder.header("stripe-signature", sig),
        None => builder,
    };
    builder.body(Body::from(payload.to_string())).unwrap()
}

fn checkout_completed_event(event_id: &str, session_id: &str) -> Value {
    json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": session_id,
                "payment_intent": "pi_webhook_123",
                "payment_status": "paid",
                "status": "complete",
                "customer_details": { "email": TEST_EMAIL, "name": "Test Buyer" },
                "amount_total": 4900,
                "currency": "usd",
                "metadata": { "license_type": "regular" }
            }
        }
    })
}

#[tokio::test]
async fn missing_signature_is_rejected() {
    let (state, _db) = create_test_state();
    {
        let conn = state.db.get().unwrap();
        seed_stripe_config(&conn);
    }

    let payload = checkout_completed_event("evt_1", "cs_1").to_string();
    let response = test_app(&state)
        .oneshot(webhook_request(&payload, None))
        .await
        .unwrap();

    assert_status(&response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_signature_is_rejected_before_processing() {
    let (state, _db) = create_test_state();
    let session_id = "cs_sig_test";
    {
        let conn = state.db.get().unwrap();
        seed_stripe_config(&conn);
        let (regular, _) = seed_products(&conn);
        seed_pending_sale(&conn, &regular, session_id, TEST_EMAIL);
    }

    let payload = checkout_completed_event("evt_bad_sig", session_id).to_string();
    let response = test_app(&state)
        .oneshot(webhook_request(&payload, Some("t=0,v1=deadbeef")))
        .await
        .unwrap();

    assert_status(&response, StatusCode::UNAUTHORIZED);

    let conn = state.db.get().unwrap();
    let sale = queries::get_sale_by_session_id(&conn, session_id)
        .unwrap()
        .unwrap();
    assert_eq!(sale.status, SaleStatus::Pending);
}

#[tokio::test]
async fn paid_session_completes_the_pending_sale() {
    let (state, _db) = create_test_state();
    let session_id = "cs_complete_test";
    {
        let conn = state.db.get().unwrap();
        seed_stripe_config(&conn);
        let (regular, _) = seed_products(&conn);
        seed_pending_sale(&conn, &regular, session_id, TEST_EMAIL);
    }

    let payload = checkout_completed_event("evt_complete", session_id).to_string();
    let signature = signature_header(&payload);
    let response = test_app(&state)
        .oneshot(webhook_request(&payload, Some(&signature)))
        .await
        .unwrap();

    assert_status(&response, StatusCode::OK);

    let conn = state.db.get().unwrap();
    let sale = queries::get_sale_by_session_id(&conn, session_id)
        .unwrap()
        .unwrap();
    assert_eq!(sale.status, SaleStatus::Completed);
    assert_eq!(sale.stripe_payment_id.as_deref(), Some("pi_webhook_123"));
    assert_eq!(sale.customer_name.as_deref(), Some("Test Buyer"));
}

#[tokio::test]
async fn duplicate_delivery_is_acknowledged_once() {
    let (state, _db) = create_test_state();
    let session_id = "cs_dup_test";
    {
        let conn = state.db.get().unwrap();
        seed_stripe_config(&conn);
        let (regular, _) = seed_products(&conn);
        seed_pending_sale(&conn, &regular, session_id, TEST_EMAIL);
    }

    let payload = checkout_completed_event("evt_dup", session_id).to_string();
    let signature = signature_header(&payload);
    let app = test_app(&state);

    let first = app
        .clone()
        .oneshot(webhook_request(&payload, Some(&signature)))
        .await
        .unwrap();
    assert_status(&first, StatusCode::OK);

    let second = app
        .oneshot(webhook_request(&payload, Some(&signature)))
        .await
        .unwrap();
    assert_status(&second, StatusCode::OK);

    let conn = state.db.get().unwrap();
    let sale = queries::get_sale_by_session_id(&conn, session_id)
        .unwrap()
        .unwrap();
    assert_eq!(sale.status, SaleStatus::Completed);
}

#[tokio::test]
async fn paid_session_without_a_sale_creates_one_completed() {
    let (state, _db) = create_test_state();
    let session_id = "cs_direct_test";
    {
        let conn = state.db.get().unwrap();
        seed_stripe_config(&conn);
        seed_products(&conn);
    }

    let payload = checkout_completed_event("evt_direct", session_id).to_string();
    let signature = signature_header(&payload);
    let response = test_app(&state)
        .oneshot(webhook_request(&payload, Some(&signature)))
        .await
        .unwrap();

    assert_status(&response, StatusCode::OK);

    let conn = state.db.get().unwrap();
    let sale = queries::get_sale_by_session_id(&conn, session_id)
        .unwrap()
        .unwrap();
    assert_eq!(sale.status, SaleStatus::Completed);
    assert_eq!(sale.customer_email, TEST_EMAIL);
    assert!(sale.license_key.starts_with("PFX-"));
}

#[tokio::test]
async fn failed_payment_fails_the_pending_sale() {
    let (state, _db) = create_test_state();
    let payment_id = "pi_fail_test";
    {
        let conn = state.db.get().unwrap();
        seed_stripe_config(&conn);
        let (regular, _) = seed_products(&conn);
        let sale = seed_pending_sale(&conn, &regular, "cs_fail_test", TEST_EMAIL);
        conn.execute(
            "UPDATE sales SET stripe_payment_id = ?1 WHERE id = ?2",
            rusqlite::params![payment_id, &sale.id],
        )
        .unwrap();
    }

    let payload = json!({
        "id": "evt_fail",
        "type": "payment_intent.payment_failed",
        "data": { "object": { "id": payment_id } }
    })
    .to_string();
    let signature = signature_header(&payload);
    let response = test_app(&state)
        .oneshot(webhook_request(&payload, Some(&signature)))
        .await
        .unwrap();

    assert_status(&response, StatusCode::OK);

    let conn = state.db.get().unwrap();
    let sale = queries::get_sale_by_session_id(&conn, "cs_fail_test")
        .unwrap()
        .unwrap();
    assert_eq!(sale.status, SaleStatus::Failed);
}

#[tokio::test]
async fn refunded_charge_refunds_the_completed_sale() {
    let (state, _db) = create_test_state();
    {
        let conn = state.db.get().unwrap();
        seed_stripe_config(&conn);
        let (regular, _) = seed_products(&conn);
        seed_completed_sale(&conn, &regular, TEST_KEY, TEST_EMAIL);
    }

    let payload = json!({
        "id": "evt_refund",
        "type": "charge.refunded",
        "data": {
            "object": {
                "id": "ch_refund_test",
                "payment_intent": format!("pi_test_{}", TEST_KEY),
                "refunded": true
            }
        }
    })
    .to_string();
    let signature = signature_header(&payload);
    let response = test_app(&state)
        .oneshot(webhook_request(&payload, Some(&signature)))
        .await
        .unwrap();

    assert_status(&response, StatusCode::OK);

    let conn = state.db.get().unwrap();
    let sale = queries::get_completed_sale_by_key(&conn, TEST_KEY).unwrap();
    assert!(sale.is_none(), "refunded sale must stop validating");
}

#[tokio::test]
async fn unhandled_event_types_are_acknowledged() {
    let (state, _db) = create_test_state();
    {
        let conn = state.db.get().unwrap();
        seed_stripe_config(&conn);
    }

    let payload = json!({
        "id": "evt_other",
        "type": "customer.subscription.created",
        "data": { "object": {} }
    })
    .to_string();
    let signature = signature_header(&payload);
    let response = test_app(&state)
        .oneshot(webhook_request(&payload, Some(&signature)))
        .await
        .unwrap();

    assert_status(&response, StatusCode::OK);
}
