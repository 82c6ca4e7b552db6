use axum::http::StatusCode;
use chrono::Utc;
use serde_json::json;
use tower::ServiceExt;

use crate::common::*;
use keyfront::db::queries;
use keyfront::token::DownloadToken;

const PACKAGE: &[u8] = b"PK\x03\x04fake-zip-contents";

async fn issue_token(state: &keyfront::db::AppState) -> String {
    let response = test_app(state)
        .oneshot(json_request(
            "POST",
            "/members/download",
            json!({ "licenseKey": TEST_KEY, "email": TEST_EMAIL }),
        ))
        .await
        .unwrap();
    assert_status(&response, StatusCode::OK);
    body_json(response).await["downloadUrl"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn redeeming_a_fresh_token_streams_the_package() {
    let (state, _db) = create_test_state();
    {
        let conn = state.db.get().unwrap();
        let (regular, _) = seed_products(&conn);
        seed_completed_sale(&conn, &regular, TEST_KEY, TEST_EMAIL);
    }
    write_package_file(&state, "regular", PACKAGE);

    let url = issue_token(&state).await;
    let response = test_app(&state).oneshot(get_request(&url)).await.unwrap();

    assert_status(&response, StatusCode::OK);
    let headers = response.headers().clone();
    assert_eq!(headers["content-type"], "application/zip");
    assert_eq!(
        headers["content-disposition"],
        "attachment; filename=\"crm-api-module-regular.zip\""
    );
    assert_eq!(
        headers["cache-control"],
        "no-cache, no-store, must-revalidate"
    );
    assert_eq!(body_bytes(response).await, PACKAGE);
}

#[tokio::test]
async fn redemption_does_not_charge_the_quota_again() {
    let (state, _db) = create_test_state();
    let sale_id;
    {
        let conn = state.db.get().unwrap();
        let (regular, _) = seed_products(&conn);
        sale_id = seed_completed_sale(&conn, &regular, TEST_KEY, TEST_EMAIL).id;
    }
    write_package_file(&state, "regular", PACKAGE);

    let url = issue_token(&state).await;
    let response = test_app(&state).oneshot(get_request(&url)).await.unwrap();
    assert_status(&response, StatusCode::OK);

    let conn = state.db.get().unwrap();
    let sale = queries::get_sale_by_id(&conn, &sale_id).unwrap().unwrap();
    assert_eq!(sale.download_count, 1);
}

#[tokio::test]
async fn garbage_token_is_bad_request() {
    let (state, _db) = create_test_state();

    let response = test_app(&state)
        .oneshot(get_request("/members/download/not-a-real-token"))
        .await
        .unwrap();

    assert_status(&response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let (state, _db) = create_test_state();
    {
        let conn = state.db.get().unwrap();
        let (regular, _) = seed_products(&conn);
        seed_completed_sale(&conn, &regular, TEST_KEY, TEST_EMAIL);
    }
    write_package_file(&state, "regular", PACKAGE);

    let stale = DownloadToken::new(TEST_KEY, TEST_EMAIL, Utc::now().timestamp() - 7200)
        .sign(TEST_TOKEN_SECRET)
        .unwrap();

    let response = test_app(&state)
        .oneshot(get_request(&format!("/members/download/{}", stale)))
        .await
        .unwrap();

    assert_status(&response, StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Download token expired");
}

#[tokio::test]
async fn token_signed_with_another_secret_is_rejected() {
    let (state, _db) = create_test_state();
    {
        let conn = state.db.get().unwrap();
        let (regular, _) = seed_products(&conn);
        seed_completed_sale(&conn, &regular, TEST_KEY, TEST_EMAIL);
    }
    write_package_file(&state, "regular", PACKAGE);

    let forged = DownloadToken::new(TEST_KEY, TEST_EMAIL, Utc::now().timestamp())
        .sign("some-other-secret")
        .unwrap();

    let response = test_app(&state)
        .oneshot(get_request(&format!("/members/download/{}", forged)))
        .await
        .unwrap();

    assert_status(&response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn refund_inside_the_window_revokes_the_token() {
    let (state, _db) = create_test_state();
    let sale_id;
    {
        let conn = state.db.get().unwrap();
        let (regular, _) = seed_products(&conn);
        sale_id = seed_completed_sale(&conn, &regular, TEST_KEY, TEST_EMAIL).id;
    }
    write_package_file(&state, "regular", PACKAGE);

    let url = issue_token(&state).await;
    {
        let conn = state.db.get().unwrap();
        assert!(queries::mark_sale_refunded(&conn, &sale_id).unwrap());
    }

    let response = test_app(&state).oneshot(get_request(&url)).await.unwrap();
    assert_status(&response, StatusCode::UNAUTHORIZED);
}
