use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use crate::common::*;
use keyfront::db::queries;
use keyfront::models::MASKED_SECRET;

#[tokio::test]
async fn stripe_secrets_are_masked_on_read() {
    let (state, _db) = create_test_state();
    let token;
    {
        let conn = state.db.get().unwrap();
        token = seed_admin(&conn);
    }
    let app = test_app(&state);

    let put = app
        .clone()
        .oneshot(authed_request(
            "PUT",
            "/admin/config/stripe",
            &token,
            Some(json!({
                "publishable_key": "pk_live_abc",
                "secret_key": "sk_live_abc",
                "webhook_secret": "whsec_abc",
                "regular_price_id": "price_r",
                "extended_price_id": "price_e",
                "live_mode": true
            })),
        ))
        .await
        .unwrap();
    assert_status(&put, StatusCode::OK);
    let body = body_json(put).await;
    assert_eq!(body["configured"], true);
    assert_eq!(body["config"]["secret_key"], MASKED_SECRET);
    assert_eq!(body["config"]["webhook_secret"], MASKED_SECRET);
    assert_eq!(body["config"]["publishable_key"], "pk_live_abc");

    let get = app
        .oneshot(authed_request("GET", "/admin/config/stripe", &token, None))
        .await
        .unwrap();
    let body = body_json(get).await;
    assert_eq!(body["config"]["secret_key"], MASKED_SECRET);
    assert_eq!(body["config"]["live_mode"], true);
}

#[tokio::test]
async fn masked_sentinel_keeps_the_stored_secret() {
    let (state, _db) = create_test_state();
    let token;
    {
        let conn = state.db.get().unwrap();
        token = seed_admin(&conn);
    }
    let app = test_app(&state);

    app.clone()
        .oneshot(authed_request(
            "PUT",
            "/admin/config/stripe",
            &token,
            Some(json!({ "secret_key": "sk_live_original", "webhook_secret": "whsec_original" })),
        ))
        .await
        .unwrap();

    // Round-trip the masked GET response, changing only a non-secret field.
    let put = app
        .oneshot(authed_request(
            "PUT",
            "/admin/config/stripe",
            &token,
            Some(json!({
                "secret_key": MASKED_SECRET,
                "webhook_secret": MASKED_SECRET,
                "regular_price_id": "price_new"
            })),
        ))
        .await
        .unwrap();
    assert_status(&put, StatusCode::OK);

    let conn = state.db.get().unwrap();
    let stored = queries::get_stripe_config(&conn).unwrap().unwrap();
    assert_eq!(stored.secret_key.as_deref(), Some("sk_live_original"));
    assert_eq!(stored.webhook_secret.as_deref(), Some("whsec_original"));
    assert_eq!(stored.regular_price_id.as_deref(), Some("price_new"));
}

#[tokio::test]
async fn mail_config_round_trip_and_delete() {
    let (state, _db) = create_test_state();
    let token;
    {
        let conn = state.db.get().unwrap();
        token = seed_admin(&conn);
    }
    let app = test_app(&state);

    let put = app
        .clone()
        .oneshot(authed_request(
            "PUT",
            "/admin/config/email",
            &token,
            Some(json!({
                "api_key": "re_secret_key",
                "from_email": "store@example.com",
                "from_name": "Store",
                "enabled": true
            })),
        ))
        .await
        .unwrap();
    assert_status(&put, StatusCode::OK);
    let body = body_json(put).await;
    assert_eq!(body["config"]["api_key"], MASKED_SECRET);
    assert_eq!(body["config"]["from_email"], "store@example.com");

    // Sentinel preserves the relay key here too.
    let update = app
        .clone()
        .oneshot(authed_request(
            "PUT",
            "/admin/config/email",
            &token,
            Some(json!({
                "api_key": MASKED_SECRET,
                "from_email": "store@example.com",
                "from_name": "New Name",
                "enabled": false
            })),
        ))
        .await
        .unwrap();
    assert_status(&update, StatusCode::OK);
    {
        let conn = state.db.get().unwrap();
        let stored = queries::get_mail_config(&conn).unwrap().unwrap();
        assert_eq!(stored.api_key.as_deref(), Some("re_secret_key"));
        assert_eq!(stored.from_name, "New Name");
        assert!(!stored.enabled);
    }

    let delete = app
        .clone()
        .oneshot(authed_request("DELETE", "/admin/config/email", &token, None))
        .await
        .unwrap();
    assert_eq!(body_json(delete).await["success"], true);

    let get = app
        .oneshot(authed_request("GET", "/admin/config/email", &token, None))
        .await
        .unwrap();
    assert_eq!(body_json(get).await["configured"], false);
}
