use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use crate::db::{AppState, queries};
use crate::handlers::public::send_license_email_for;
use crate::models::{CreateSale, SaleStatus};
use crate::payments::{
    StripeCharge, StripeCheckoutSession, StripeClient, StripePaymentIntent, StripeWebhookEvent,
};

pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = match headers.get("stripe-signature") {
        Some(sig) => match sig.to_str() {
            Ok(s) => s.to_string(),
            Err(_) => return (StatusCode::BAD_REQUEST, "Invalid signature header"),
        },
        None => return (StatusCode::BAD_REQUEST, "Missing stripe-signature header"),
    };

    // The signature is checked before anything in the payload is trusted,
    // including the event id used for deduplication.
    let client = {
        let conn = match state.db.get() {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("DB connection error: {}", e);
                return (StatusCode::INTERNAL_SERVER_ERROR, "Database error");
            }
        };
        let config = match queries::get_stripe_config(&conn) {
            Ok(Some(c)) => c,
            Ok(None) => {
                tracing::error!("Webhook received but Stripe is not configured");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Stripe not configured");
            }
            Err(e) => {
                tracing::error!("DB error: {}", e);
                return (StatusCode::INTERNAL_SERVER_ERROR, "Database error");
            }
        };
        match StripeClient::new(&config) {
            Ok(c) => c,
            Err(_) => {
                tracing::error!("Webhook received but Stripe is not configured");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Stripe not configured");
            }
        }
    };

    match client.verify_webhook_signature(&body, &signature) {
        Ok(true) => {}
        Ok(false) => return (StatusCode::UNAUTHORIZED, "Invalid signature"),
        Err(e) => {
            tracing::error!("Signature verification error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Signature verification failed");
        }
    }

    let event: StripeWebhookEvent = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to parse Stripe webhook: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid JSON");
        }
    };

    // Duplicate deliveries are acknowledged without reprocessing.
    {
        let conn = match state.db.get() {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("DB connection error: {}", e);
                return (StatusCode::INTERNAL_SERVER_ERROR, "Database error");
            }
        };
        match queries::record_webhook_event(&conn, &event.id, &event.event_type) {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(event_id = %event.id, "Duplicate webhook delivery ignored");
                return (StatusCode::OK, "Already processed");
            }
            Err(e) => {
                tracing::error!("DB error: {}", e);
                return (StatusCode::INTERNAL_SERVER_ERROR, "Database error");
            }
        }
    }

    let result = match event.event_type.as_str() {
        "checkout.session.completed" => handle_checkout_completed(&state, &event).await,
        "payment_intent.payment_failed" => handle_payment_failed(&state, &event),
        "charge.refunded" => handle_charge_refunded(&state, &event),
        _ => {
            tracing::debug!(event_type = %event.event_type, "Unhandled webhook event type");
            (StatusCode::OK, "Event ignored")
        }
    };

    let error = (result.0 != StatusCode::OK).then_some(result.1);
    if let Ok(conn) = state.db.get() {
        if let Err(e) = queries::mark_webhook_processed(&conn, &event.id, error) {
            tracing::error!("Failed to mark webhook processed: {}", e);
        }
    }

    result
}

/// checkout.session.completed - the asynchronous sale-completion path.
///
/// Normally the checkout endpoint already recorded a pending sale for this
/// session and completion just flips its status. A sale can be missing when
/// the checkout happened outside this service (e.g. a payment link), in
/// which case one is created directly in the completed state.
async fn handle_checkout_completed(
    state: &AppState,
    event: &StripeWebhookEvent,
) -> (StatusCode, &'static str) {
    let session: StripeCheckoutSession = match serde_json::from_value(event.data.object.clone()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to parse checkout session: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid checkout session");
        }
    };

    if !session.is_paid() {
        return (StatusCode::OK, "Payment not completed");
    }

    let conn = match state.db.get() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("DB connection error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };

    let completion = match queries::mark_sale_completed(
        &conn,
        &session.id,
        session.payment_intent.as_deref(),
        session.customer_name(),
    ) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to complete sale: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to complete sale");
        }
    };

    let sale = match completion {
        queries::CompletionResult::Completed(sale) => sale,
        queries::CompletionResult::AlreadyCompleted(sale) => {
            tracing::info!(
                session_id = %session.id,
                license_key = %sale.license_key,
                "Sale already completed"
            );
            return (StatusCode::OK, "Already processed");
        }
        queries::CompletionResult::NotFound => {
            match create_sale_from_session(&conn, state, &session) {
                Ok(Some(sale)) => sale,
                Ok(None) => return (StatusCode::OK, "No product for session"),
                Err(status) => return status,
            }
        }
    };

    drop(conn);

    tracing::info!(
        session_id = %session.id,
        license_key = %sale.license_key,
        "Sale completed via webhook"
    );

    send_license_email_for(state, &sale.id).await;

    (StatusCode::OK, "OK")
}

/// Create a completed sale for a paid session with no pending record.
fn create_sale_from_session(
    conn: &rusqlite::Connection,
    state: &AppState,
    session: &StripeCheckoutSession,
) -> Result<Option<crate::models::Sale>, (StatusCode, &'static str)> {
    let license_type = session
        .metadata
        .get("license_type")
        .and_then(|v| v.as_str())
        .unwrap_or("regular");

    let product = match queries::get_active_product_by_license_type(conn, license_type) {
        Ok(Some(p)) => p,
        Ok(None) => {
            tracing::error!(license_type, "No active product for paid session");
            return Ok(None);
        }
        Err(e) => {
            tracing::error!("DB error: {}", e);
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "Database error"));
        }
    };

    let Some(email) = session.email() else {
        tracing::error!(session_id = %session.id, "Paid session has no customer email");
        return Ok(None);
    };

    let sale = queries::create_sale(
        conn,
        &CreateSale {
            stripe_session_id: Some(&session.id),
            stripe_payment_id: session.payment_intent.as_deref(),
            customer_email: email,
            customer_name: session.customer_name(),
            amount_cents: session.amount_total.unwrap_or(product.price_cents),
            currency: session.currency.as_deref().unwrap_or(&product.currency),
            product_id: &product.id,
            status: SaleStatus::Completed,
            metadata: session.metadata.clone(),
        },
        &state.license_key_prefix,
    );

    match sale {
        Ok(sale) => {
            tracing::info!(
                session_id = %session.id,
                license_key = %sale.license_key,
                "Sale created directly from paid session"
            );
            Ok(Some(sale))
        }
        Err(e) => {
            tracing::error!("Failed to create sale from session: {}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to create sale"))
        }
    }
}

/// payment_intent.payment_failed - pending sale becomes failed.
fn handle_payment_failed(
    state: &AppState,
    event: &StripeWebhookEvent,
) -> (StatusCode, &'static str) {
    let intent: StripePaymentIntent = match serde_json::from_value(event.data.object.clone()) {
        Ok(i) => i,
        Err(e) => {
            tracing::error!("Failed to parse payment intent: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid payment intent");
        }
    };

    let conn = match state.db.get() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("DB connection error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };

    match queries::mark_sale_failed(&conn, &intent.id) {
        Ok(true) => tracing::info!(payment_id = %intent.id, "Sale marked failed"),
        Ok(false) => tracing::debug!(payment_id = %intent.id, "No pending sale for failed payment"),
        Err(e) => {
            tracing::error!("Failed to mark sale failed: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    }

    (StatusCode::OK, "OK")
}

/// charge.refunded - completed sale becomes refunded, matched by the
/// payment reference. An unmatched refund is acknowledged; the charge may
/// predate this service.
fn handle_charge_refunded(
    state: &AppState,
    event: &StripeWebhookEvent,
) -> (StatusCode, &'static str) {
    let charge: StripeCharge = match serde_json::from_value(event.data.object.clone()) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to parse charge: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid charge");
        }
    };

    if !charge.refunded {
        return (StatusCode::OK, "Charge not fully refunded");
    }

    let Some(payment_intent) = charge.payment_intent.as_deref() else {
        return (StatusCode::OK, "No payment intent on charge");
    };

    let conn = match state.db.get() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("DB connection error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };

    match queries::mark_sale_refunded_by_payment(&conn, payment_intent) {
        Ok(true) => tracing::info!(payment_id = %payment_intent, "Sale marked refunded"),
        Ok(false) => {
            tracing::warn!(payment_id = %payment_intent, "No completed sale for refunded charge")
        }
        Err(e) => {
            tracing::error!("Failed to mark sale refunded: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    }

    (StatusCode::OK, "OK")
}
