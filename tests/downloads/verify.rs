use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use crate::common::*;

#[tokio::test]
async fn wrong_email_is_unauthorized() {
    let (state, _db) = create_test_state();
    {
        let conn = state.db.get().unwrap();
        let (regular, _) = seed_products(&conn);
        seed_completed_sale(&conn, &regular, TEST_KEY, TEST_EMAIL);
    }

    let response = test_app(&state)
        .oneshot(json_request(
            "POST",
            "/members/verify",
            json!({ "licenseKey": TEST_KEY, "email": "other@example.com" }),
        ))
        .await
        .unwrap();

    assert_status(&response, StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid license key or email");
}

#[tokio::test]
async fn valid_pair_returns_purchase_record() {
    let (state, _db) = create_test_state();
    {
        let conn = state.db.get().unwrap();
        let (regular, _) = seed_products(&conn);
        seed_completed_sale(&conn, &regular, TEST_KEY, TEST_EMAIL);
    }

    let response = test_app(&state)
        .oneshot(json_request(
            "POST",
            "/members/verify",
            json!({ "licenseKey": TEST_KEY, "email": TEST_EMAIL }),
        ))
        .await
        .unwrap();

    assert_status(&response, StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["licenseKey"], TEST_KEY);
    assert_eq!(body["customerEmail"], TEST_EMAIL);
    assert_eq!(body["product"]["licenseType"], "regular");
    assert_eq!(body["downloadCount"], 0);
    assert!(body["lastDownloadAt"].is_null());
    assert_eq!(body["recentDownloads"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn email_match_is_case_insensitive() {
    let (state, _db) = create_test_state();
    {
        let conn = state.db.get().unwrap();
        let (regular, _) = seed_products(&conn);
        seed_completed_sale(&conn, &regular, TEST_KEY, TEST_EMAIL);
    }

    let response = test_app(&state)
        .oneshot(json_request(
            "POST",
            "/members/verify",
            json!({ "licenseKey": TEST_KEY, "email": "Buyer@Example.COM" }),
        ))
        .await
        .unwrap();

    assert_status(&response, StatusCode::OK);
}
