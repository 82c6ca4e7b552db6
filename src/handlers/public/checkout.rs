use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Query};
use crate::models::{CreateSale, SaleStatus, SaleWithProduct};
use crate::payments::StripeClient;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub license_type: String,
    pub customer_email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: String,
}

/// POST /checkout - start a hosted-checkout session.
///
/// The pending sale is created up front with its license key already
/// generated; payment confirmation only flips the status. An abandoned
/// checkout leaves a pending sale whose key is never redeemable, since
/// every consumer-facing check requires status completed.
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    if request.customer_email.is_empty() {
        return Err(AppError::BadRequest("Customer email is required".into()));
    }

    let (product, stripe, price_id) = {
        let conn = state.db.get()?;

        let product = queries::get_active_product_by_license_type(&conn, &request.license_type)?
            .ok_or_else(|| AppError::BadRequest("Unknown license type".into()))?;

        let config = queries::get_stripe_config(&conn)?
            .ok_or_else(|| AppError::BadRequest("Stripe is not configured".into()))?;

        let price_id = match request.license_type.as_str() {
            "extended" => config.extended_price_id.clone(),
            _ => config.regular_price_id.clone(),
        }
        .or_else(|| product.stripe_price_id.clone())
        .ok_or_else(|| {
            AppError::BadRequest("Products not configured. Please complete Stripe setup.".into())
        })?;

        (product, StripeClient::new(&config)?, price_id)
    };

    let success_url = format!(
        "{}/success?session_id={{CHECKOUT_SESSION_ID}}",
        state.base_url
    );
    let cancel_url = format!("{}/#pricing", state.base_url);

    let (session_id, url) = stripe
        .create_checkout_session(
            &price_id,
            &request.customer_email,
            &product.license_type,
            &product.name,
            &success_url,
            &cancel_url,
        )
        .await?;

    let conn = state.db.get()?;
    let sale = queries::create_sale(
        &conn,
        &CreateSale {
            stripe_session_id: Some(&session_id),
            stripe_payment_id: None,
            customer_email: &request.customer_email,
            customer_name: None,
            amount_cents: product.price_cents,
            currency: &product.currency,
            product_id: &product.id,
            status: SaleStatus::Pending,
            metadata: serde_json::json!({ "license_type": product.license_type }),
        },
        &state.license_key_prefix,
    )?;

    tracing::info!(
        session_id = %session_id,
        license_key = %sale.license_key,
        license_type = %product.license_type,
        "Checkout session created"
    );

    Ok(Json(CheckoutResponse {
        session_id,
        url,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CheckoutStatusQuery {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutStatusResponse {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_cents: Option<i64>,
}

/// GET /checkout/status?session_id= - synchronous completion poll.
///
/// The success page polls this after the checkout redirect. A paid session
/// completes the sale through the same idempotent path the webhook uses;
/// whichever runs second is a no-op.
pub async fn checkout_status(
    State(state): State<AppState>,
    Query(query): Query<CheckoutStatusQuery>,
) -> Result<Json<CheckoutStatusResponse>> {
    if query.session_id.is_empty() {
        return Err(AppError::BadRequest("Session ID required".into()));
    }

    let stripe = {
        let conn = state.db.get()?;
        let config = queries::get_stripe_config(&conn)?
            .ok_or_else(|| AppError::BadRequest("Stripe is not configured".into()))?;
        StripeClient::new(&config)?
    };

    let session = stripe.retrieve_checkout_session(&query.session_id).await?;

    let mut license_key = None;
    let mut customer_email = None;
    let mut amount_cents = None;

    if session.is_paid() {
        let conn = state.db.get()?;
        let completion = queries::mark_sale_completed(
            &conn,
            &query.session_id,
            session.payment_intent.as_deref(),
            session.customer_name(),
        )?;

        let sale = match completion {
            queries::CompletionResult::Completed(sale) => {
                tracing::info!(
                    session_id = %query.session_id,
                    license_key = %sale.license_key,
                    "Sale completed via status poll"
                );
                send_license_email_for(&state, &sale.id).await;
                Some(sale)
            }
            queries::CompletionResult::AlreadyCompleted(sale) => Some(sale),
            queries::CompletionResult::NotFound => {
                tracing::warn!(
                    session_id = %query.session_id,
                    "Paid session has no recorded sale"
                );
                None
            }
        };

        if let Some(sale) = sale {
            license_key = Some(sale.license_key);
            customer_email = Some(sale.customer_email);
            amount_cents = Some(sale.amount_cents);
        }
    }

    Ok(Json(CheckoutStatusResponse {
        status: session.status,
        payment_status: session.payment_status,
        license_key,
        customer_email,
        amount_cents,
    }))
}

/// Send the license email for a completed sale. Fail-soft: delivery
/// problems are logged and never surface to the purchase flow.
pub(crate) async fn send_license_email_for(state: &AppState, sale_id: &str) {
    let sale: Option<SaleWithProduct> = (|| -> Result<_> {
        let conn = state.db.get()?;
        let Some(sale) = queries::get_sale_by_id(&conn, sale_id)? else {
            return Ok(None);
        };
        queries::get_completed_sale_by_key(&conn, &sale.license_key)
    })()
    .unwrap_or_else(|e| {
        tracing::error!(sale_id = %sale_id, error = %e, "Could not load sale for license email");
        None
    });

    let Some(sale) = sale else {
        return;
    };

    let mail_config = {
        let conn = match state.db.get() {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!(error = %e, "Could not load mail config");
                return;
            }
        };
        match queries::get_mail_config(&conn) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "Could not load mail config");
                return;
            }
        }
    };

    let members_url = format!("{}/members", state.base_url);
    let email = crate::email::LicenseEmail {
        to_email: &sale.sale.customer_email,
        customer_name: sale.sale.customer_name.as_deref(),
        license_key: &sale.sale.license_key,
        product_name: &sale.product.name,
        license_type: &sale.product.license_type,
        amount_cents: sale.sale.amount_cents,
        currency: &sale.sale.currency,
        members_url: &members_url,
    };

    if let Err(e) = state
        .email
        .send_license_email(mail_config.as_ref(), &email)
        .await
    {
        tracing::error!(
            sale_id = %sale_id,
            error = %e,
            "License email delivery failed; sale remains completed"
        );
    }
}
