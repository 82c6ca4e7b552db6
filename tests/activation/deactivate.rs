use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use crate::common::*;

#[tokio::test]
async fn unknown_key_reports_invalid() {
    let (state, _db) = create_test_state();
    {
        let conn = state.db.get().unwrap();
        seed_products(&conn);
    }

    let response = test_app(&state)
        .oneshot(json_request(
            "POST",
            "/license/deactivate",
            json!({ "licenseKey": "PFX-ZZZZ-ZZZZ-ZZZZ-ZZZZ", "domain": "a.com" }),
        ))
        .await
        .unwrap();

    assert_status(&response, StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Invalid license key");
}

#[tokio::test]
async fn unactivated_domain_reports_not_found() {
    let (state, _db) = create_test_state();
    {
        let conn = state.db.get().unwrap();
        let (regular, _) = seed_products(&conn);
        seed_completed_sale(&conn, &regular, TEST_KEY, TEST_EMAIL);
    }

    let response = test_app(&state)
        .oneshot(json_request(
            "POST",
            "/license/deactivate",
            json!({ "licenseKey": TEST_KEY, "domain": "never-activated.com" }),
        ))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "License not found for this domain");
}

#[tokio::test]
async fn deactivation_frees_the_single_domain_slot() {
    let (state, _db) = create_test_state();
    {
        let conn = state.db.get().unwrap();
        let (regular, _) = seed_products(&conn);
        seed_completed_sale(&conn, &regular, TEST_KEY, TEST_EMAIL);
    }
    let app = test_app(&state);

    let validate = |domain: &str| {
        json_request(
            "POST",
            "/license/validate",
            json!({ "licenseKey": TEST_KEY, "domain": domain }),
        )
    };

    // Lock onto a.com, confirm b.com is refused.
    let r = app.clone().oneshot(validate("a.com")).await.unwrap();
    assert_eq!(body_json(r).await["valid"], true);
    let r = app.clone().oneshot(validate("b.com")).await.unwrap();
    assert_eq!(body_json(r).await["valid"], false);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/license/deactivate",
            json!({ "licenseKey": TEST_KEY, "domain": "a.com" }),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "License deactivated successfully");
    assert_eq!(body["domain"], "a.com");

    // The slot moved; b.com activates now.
    let r = app.oneshot(validate("b.com")).await.unwrap();
    assert_eq!(body_json(r).await["valid"], true);
}

#[tokio::test]
async fn deactivation_normalizes_the_domain() {
    let (state, _db) = create_test_state();
    {
        let conn = state.db.get().unwrap();
        let (regular, _) = seed_products(&conn);
        seed_completed_sale(&conn, &regular, TEST_KEY, TEST_EMAIL);
    }
    let app = test_app(&state);

    let r = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/license/validate",
            json!({ "licenseKey": TEST_KEY, "domain": "a.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(r).await["valid"], true);

    let response = app
        .oneshot(json_request(
            "POST",
            "/license/deactivate",
            json!({ "licenseKey": TEST_KEY, "domain": "https://www.A.com" }),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["domain"], "a.com");
}
