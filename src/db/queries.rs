use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params, types::Value};
use uuid::Uuid;

use crate::crypto::{generate_token, hash_secret, hash_token};
use crate::error::{AppError, Result};
use crate::license::generate_license_key;
use crate::models::*;

use super::from_row::{
    ACTIVATION_COLS, ADMIN_SESSION_COLS, ADMIN_USER_COLS, DOWNLOAD_COLS, MAIL_CONFIG_COLS,
    PRODUCT_COLS, SALE_COLS, SALE_WITH_PRODUCT_COLS, STRIPE_CONFIG_COLS, query_all, query_one,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

/// Normalize an email for comparison: trim and lowercase.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Builder for dynamic UPDATE statements with optional fields.
/// Combines multiple field updates into a single query for efficiency.
struct UpdateBuilder {
    table: &'static str,
    id: String,
    fields: Vec<(&'static str, Value)>,
    track_updated_at: bool,
}

impl UpdateBuilder {
    fn new(table: &'static str, id: &str) -> Self {
        Self {
            table,
            id: id.to_string(),
            fields: Vec::new(),
            track_updated_at: false,
        }
    }

    fn with_updated_at(mut self) -> Self {
        self.track_updated_at = true;
        self
    }

    fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.fields.push((column, value.into()));
        self
    }

    fn set_opt<V: Into<Value>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    /// Set a column to an explicit value (including NULL).
    /// Use this for Option<T> where Some(v) = set to v, None = set to NULL.
    fn set_nullable<V: Into<Value>>(mut self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.fields.push((column, v.into())),
            None => self.fields.push((column, Value::Null)),
        }
        self
    }

    fn execute(mut self, conn: &Connection) -> Result<bool> {
        if self.fields.is_empty() {
            return Ok(false);
        }
        if self.track_updated_at {
            self.fields.push(("updated_at", now().into()));
        }
        let sets: Vec<String> = self
            .fields
            .iter()
            .map(|(col, _)| format!("{} = ?", col))
            .collect();
        let mut values: Vec<Value> = self.fields.into_iter().map(|(_, v)| v).collect();
        values.push(self.id.into());
        let sql = format!("UPDATE {} SET {} WHERE id = ?", self.table, sets.join(", "));
        let affected = conn.execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(affected > 0)
    }
}

// ============ Products ============

pub fn create_product(conn: &Connection, input: &CreateProduct) -> Result<Product> {
    let id = gen_id();
    let now = now();
    let features = serde_json::to_string(&input.features).unwrap_or_else(|_| "null".into());

    conn.execute(
        "INSERT INTO products (id, name, description, license_type, price_cents, currency,
            domain_limit, download_limit, support_days, updates_days, features,
            stripe_price_id, active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 1, ?13, ?13)",
        params![
            &id,
            &input.name,
            &input.description,
            &input.license_type,
            input.price_cents,
            &input.currency,
            input.domain_limit,
            input.download_limit,
            input.support_days,
            input.updates_days,
            &features,
            &input.stripe_price_id,
            now,
        ],
    )?;

    get_product_by_id(conn, &id)?
        .ok_or_else(|| AppError::Internal("Product not found after insert".into()))
}

pub fn get_product_by_id(conn: &Connection, id: &str) -> Result<Option<Product>> {
    query_one(
        conn,
        &format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLS),
        [&id],
    )
}

/// Active product for a tier tag ("regular" / "extended").
pub fn get_active_product_by_license_type(
    conn: &Connection,
    license_type: &str,
) -> Result<Option<Product>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM products WHERE license_type = ?1 AND active = 1
             ORDER BY created_at DESC",
            PRODUCT_COLS
        ),
        [&license_type],
    )
}

pub fn list_products(conn: &Connection, include_inactive: bool) -> Result<Vec<Product>> {
    if include_inactive {
        query_all(
            conn,
            &format!("SELECT {} FROM products ORDER BY price_cents", PRODUCT_COLS),
            [],
        )
    } else {
        query_all(
            conn,
            &format!(
                "SELECT {} FROM products WHERE active = 1 ORDER BY price_cents",
                PRODUCT_COLS
            ),
            [],
        )
    }
}

pub fn update_product(conn: &Connection, id: &str, input: &UpdateProduct) -> Result<bool> {
    let features = input
        .features
        .as_ref()
        .map(|f| serde_json::to_string(f).unwrap_or_else(|_| "null".into()));

    let mut builder = UpdateBuilder::new("products", id)
        .with_updated_at()
        .set_opt("name", input.name.clone())
        .set_opt("price_cents", input.price_cents)
        .set_opt("currency", input.currency.clone())
        .set_opt("domain_limit", input.domain_limit)
        .set_opt("download_limit", input.download_limit)
        .set_opt("support_days", input.support_days)
        .set_opt("updates_days", input.updates_days)
        .set_opt("features", features)
        .set_opt("active", input.active);

    // Outer None = leave untouched; Some(None) = set to NULL.
    if let Some(description) = input.description.clone() {
        builder = builder.set_nullable("description", description);
    }
    if let Some(price_id) = input.stripe_price_id.clone() {
        builder = builder.set_nullable("stripe_price_id", price_id);
    }

    builder.execute(conn)
}

/// Products are never hard-deleted, only deactivated.
pub fn deactivate_product(conn: &Connection, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE products SET active = 0, updated_at = ?2 WHERE id = ?1",
        params![id, now()],
    )?;
    Ok(affected > 0)
}

// ============ Sales ============

const KEY_GENERATION_ATTEMPTS: usize = 5;

/// Create a sale with a freshly generated license key.
///
/// The generator does no uniqueness check, so a collision surfaces as a
/// UNIQUE-constraint violation here and we retry with a new key.
pub fn create_sale(conn: &Connection, input: &CreateSale<'_>, key_prefix: &str) -> Result<Sale> {
    let product = get_product_by_id(conn, input.product_id)?
        .ok_or_else(|| AppError::BadRequest("Unknown product".into()))?;
    if !product.active {
        return Err(AppError::BadRequest("Product is not available".into()));
    }

    let metadata = serde_json::to_string(&input.metadata).unwrap_or_else(|_| "null".into());

    for attempt in 0..KEY_GENERATION_ATTEMPTS {
        let id = gen_id();
        let key = generate_license_key(key_prefix);
        let ts = now();

        let result = conn.execute(
            "INSERT INTO sales (id, stripe_session_id, stripe_payment_id, customer_email,
                customer_name, amount_cents, currency, product_id, license_key, status,
                download_count, last_download_at, metadata, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, NULL, ?11, ?12, ?12)",
            params![
                &id,
                &input.stripe_session_id,
                &input.stripe_payment_id,
                &normalize_email(input.customer_email),
                &input.customer_name,
                input.amount_cents,
                input.currency,
                input.product_id,
                &key,
                input.status.as_ref(),
                &metadata,
                ts,
            ],
        );

        match result {
            Ok(_) => {
                return get_sale_by_id(conn, &id)?
                    .ok_or_else(|| AppError::Internal("Sale not found after insert".into()));
            }
            Err(rusqlite::Error::SqliteFailure(e, ref msg))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
                    && msg.as_deref().is_some_and(|m| m.contains("license_key")) =>
            {
                tracing::warn!(attempt, "License key collision, regenerating");
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::Internal(
        "Could not generate a unique license key".into(),
    ))
}

pub fn get_sale_by_id(conn: &Connection, id: &str) -> Result<Option<Sale>> {
    query_one(
        conn,
        &format!("SELECT {} FROM sales WHERE id = ?1", SALE_COLS),
        [&id],
    )
}

pub fn get_sale_by_session_id(conn: &Connection, session_id: &str) -> Result<Option<Sale>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM sales WHERE stripe_session_id = ?1",
            SALE_COLS
        ),
        [&session_id],
    )
}

/// Completed sale for a license key, with its product.
///
/// Returns None for both "no such key" and "key exists but not completed";
/// consumer-facing checks must not tell those apart.
pub fn get_completed_sale_by_key(
    conn: &Connection,
    license_key: &str,
) -> Result<Option<SaleWithProduct>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM sales s JOIN products p ON p.id = s.product_id
             WHERE s.license_key = ?1 AND s.status = 'completed'",
            SALE_WITH_PRODUCT_COLS
        ),
        [&license_key],
    )
}

/// Completed sale matching both key and purchasing email (download gate).
pub fn get_completed_sale_by_key_and_email(
    conn: &Connection,
    license_key: &str,
    email: &str,
) -> Result<Option<SaleWithProduct>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM sales s JOIN products p ON p.id = s.product_id
             WHERE s.license_key = ?1 AND s.customer_email = ?2 AND s.status = 'completed'",
            SALE_WITH_PRODUCT_COLS
        ),
        params![license_key, normalize_email(email)],
    )
}

/// Result of a completion attempt, keyed by the external session reference.
#[derive(Debug)]
pub enum CompletionResult {
    /// Transitioned pending -> completed
    Completed(Sale),
    /// Already completed by the other path; treated as success
    AlreadyCompleted(Sale),
    /// No sale recorded for this session reference
    NotFound,
}

/// Mark the sale for a checkout session completed. Idempotent: both the
/// webhook and the status poll call this, and whichever runs second gets
/// AlreadyCompleted.
pub fn mark_sale_completed(
    conn: &Connection,
    session_id: &str,
    payment_id: Option<&str>,
    customer_name: Option<&str>,
) -> Result<CompletionResult> {
    let Some(sale) = get_sale_by_session_id(conn, session_id)? else {
        return Ok(CompletionResult::NotFound);
    };

    match sale.status {
        SaleStatus::Completed => return Ok(CompletionResult::AlreadyCompleted(sale)),
        SaleStatus::Pending => {}
        // A failed or refunded sale is never resurrected by a late event.
        SaleStatus::Failed | SaleStatus::Refunded => {
            return Ok(CompletionResult::AlreadyCompleted(sale));
        }
    }

    let affected = conn.execute(
        "UPDATE sales SET status = 'completed',
             stripe_payment_id = COALESCE(?2, stripe_payment_id),
             customer_name = COALESCE(?3, customer_name),
             updated_at = ?4
         WHERE stripe_session_id = ?1 AND status = 'pending'",
        params![session_id, payment_id, customer_name, now()],
    )?;

    if affected == 0 {
        // Lost the race to the other completion path.
        let sale = get_sale_by_session_id(conn, session_id)?
            .ok_or_else(|| AppError::Internal("Sale vanished during completion".into()))?;
        return Ok(CompletionResult::AlreadyCompleted(sale));
    }

    let sale = get_sale_by_session_id(conn, session_id)?
        .ok_or_else(|| AppError::Internal("Sale vanished during completion".into()))?;
    Ok(CompletionResult::Completed(sale))
}

/// Mark a pending sale failed, matched by payment reference. Idempotent:
/// repeat calls and calls for already-failed sales are no-ops.
pub fn mark_sale_failed(conn: &Connection, payment_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE sales SET status = 'failed', updated_at = ?2
         WHERE stripe_payment_id = ?1 AND status = 'pending'",
        params![payment_id, now()],
    )?;
    Ok(affected > 0)
}

/// Administrative refund: completed -> refunded.
pub fn mark_sale_refunded(conn: &Connection, sale_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE sales SET status = 'refunded', updated_at = ?2
         WHERE id = ?1 AND status = 'completed'",
        params![sale_id, now()],
    )?;
    Ok(affected > 0)
}

/// Refund keyed by the payment reference (charge.refunded webhook).
pub fn mark_sale_refunded_by_payment(conn: &Connection, payment_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE sales SET status = 'refunded', updated_at = ?2
         WHERE stripe_payment_id = ?1 AND status = 'completed'",
        params![payment_id, now()],
    )?;
    Ok(affected > 0)
}

/// Completed sales since `since`, newest first, for the sales report.
pub fn list_completed_sales_since(
    conn: &Connection,
    since: i64,
) -> Result<Vec<SaleWithProduct>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM sales s JOIN products p ON p.id = s.product_id
             WHERE s.status = 'completed' AND s.created_at >= ?1
             ORDER BY s.created_at DESC",
            SALE_WITH_PRODUCT_COLS
        ),
        [since],
    )
}

// ============ Downloads ============

/// Append a download audit row and charge the sale's quota counter.
///
/// Runs in one transaction: the audit row and the counter increment succeed
/// or fail together, so `COUNT(downloads)` can never exceed download_count.
pub fn record_download(conn: &mut Connection, input: &CreateDownload<'_>) -> Result<Download> {
    let id = gen_id();
    let ts = now();

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute(
        "INSERT INTO downloads (id, sale_id, file_name, file_path, file_size,
            ip_address, user_agent, downloaded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            &id,
            input.sale_id,
            input.file_name,
            input.file_path,
            input.file_size,
            &input.ip_address,
            &input.user_agent,
            ts,
        ],
    )?;
    tx.execute(
        "UPDATE sales SET download_count = download_count + 1,
             last_download_at = ?2, updated_at = ?2
         WHERE id = ?1",
        params![input.sale_id, ts],
    )?;
    tx.commit()?;

    Ok(Download {
        id,
        sale_id: input.sale_id.to_string(),
        file_name: input.file_name.to_string(),
        file_path: input.file_path.to_string(),
        file_size: input.file_size,
        ip_address: input.ip_address.map(String::from),
        user_agent: input.user_agent.map(String::from),
        downloaded_at: ts,
    })
}

pub fn list_recent_downloads_for_sale(
    conn: &Connection,
    sale_id: &str,
    limit: i64,
) -> Result<Vec<Download>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM downloads WHERE sale_id = ?1
             ORDER BY downloaded_at DESC LIMIT ?2",
            DOWNLOAD_COLS
        ),
        params![sale_id, limit],
    )
}

pub fn count_downloads_for_sale(conn: &Connection, sale_id: &str) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM downloads WHERE sale_id = ?1",
        [&sale_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

// ============ License activations ============

/// The activation decision for (license_key, domain), atomically.
///
/// The conflict check and the upsert run in one IMMEDIATE transaction, so
/// two racing activations of a single-domain license cannot both succeed:
/// SQLite serializes writers, and the UNIQUE(license_key, domain) constraint
/// backstops the upsert itself.
///
/// `domain` must already be normalized.
pub fn activate_license(
    conn: &mut Connection,
    license_key: &str,
    domain: &str,
    single_domain: bool,
) -> Result<ActivationOutcome> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if single_domain {
        let other: Option<String> = tx
            .query_row(
                "SELECT domain FROM license_activations
                 WHERE license_key = ?1 AND domain != ?2 AND is_active = 1
                 LIMIT 1",
                params![license_key, domain],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(activated_domain) = other {
            // Read-only so far; nothing to roll back, but be explicit.
            tx.rollback()?;
            return Ok(ActivationOutcome::Conflict { activated_domain });
        }
    }

    let ts = now();
    tx.execute(
        "INSERT INTO license_activations (id, license_key, domain, is_active, created_at, last_seen_at)
         VALUES (?1, ?2, ?3, 1, ?4, ?4)
         ON CONFLICT(license_key, domain)
         DO UPDATE SET is_active = 1, last_seen_at = ?4",
        params![gen_id(), license_key, domain, ts],
    )?;
    tx.commit()?;

    Ok(ActivationOutcome::Activated)
}

/// Flip the (key, domain) row inactive. Returns false when there is nothing
/// to deactivate. `domain` must already be normalized.
pub fn deactivate_domain(conn: &Connection, license_key: &str, domain: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE license_activations SET is_active = 0, last_seen_at = ?3
         WHERE license_key = ?1 AND domain = ?2",
        params![license_key, domain, now()],
    )?;
    Ok(affected > 0)
}

pub fn get_activation(
    conn: &Connection,
    license_key: &str,
    domain: &str,
) -> Result<Option<LicenseActivation>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM license_activations WHERE license_key = ?1 AND domain = ?2",
            ACTIVATION_COLS
        ),
        params![license_key, domain],
    )
}

pub fn list_activations_for_key(
    conn: &Connection,
    license_key: &str,
) -> Result<Vec<LicenseActivation>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM license_activations WHERE license_key = ?1
             ORDER BY created_at",
            ACTIVATION_COLS
        ),
        [&license_key],
    )
}

// ============ Admin users & sessions ============

pub fn count_admins(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM admin_users", [], |row| row.get(0))?;
    Ok(count)
}

pub fn create_admin(conn: &Connection, email: &str, password: &str) -> Result<AdminUser> {
    let id = gen_id();
    let ts = now();
    let password_hash = hash_secret(password);

    conn.execute(
        "INSERT INTO admin_users (id, email, password_hash, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![&id, &normalize_email(email), &password_hash, ts],
    )?;

    Ok(AdminUser {
        id,
        email: normalize_email(email),
        password_hash,
        created_at: ts,
    })
}

pub fn get_admin_by_email(conn: &Connection, email: &str) -> Result<Option<AdminUser>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM admin_users WHERE email = ?1",
            ADMIN_USER_COLS
        ),
        [&normalize_email(email)],
    )
}

const SESSION_TTL_SECS: i64 = 7 * 24 * 3600;

/// Create a session and return the plain bearer token (only handed out
/// here; the database keeps a hash).
pub fn create_admin_session(conn: &Connection, admin_id: &str) -> Result<String> {
    let token = generate_token();
    let ts = now();

    conn.execute(
        "INSERT INTO admin_sessions (id, admin_id, token_hash, expires_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            gen_id(),
            admin_id,
            hash_token(&token),
            ts + SESSION_TTL_SECS,
            ts
        ],
    )?;

    Ok(token)
}

/// Resolve a bearer token to its admin, rejecting expired sessions.
pub fn get_admin_by_session_token(conn: &Connection, token: &str) -> Result<Option<AdminUser>> {
    let session: Option<AdminSession> = query_one(
        conn,
        &format!(
            "SELECT {} FROM admin_sessions WHERE token_hash = ?1",
            ADMIN_SESSION_COLS
        ),
        [&hash_token(token)],
    )?;

    let Some(session) = session else {
        return Ok(None);
    };
    if session.expires_at < now() {
        return Ok(None);
    }

    query_one(
        conn,
        &format!("SELECT {} FROM admin_users WHERE id = ?1", ADMIN_USER_COLS),
        [&session.admin_id],
    )
}

pub fn delete_admin_session(conn: &Connection, token: &str) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM admin_sessions WHERE token_hash = ?1",
        [&hash_token(token)],
    )?;
    Ok(affected > 0)
}

// ============ Stripe / mail configuration ============

pub fn get_stripe_config(conn: &Connection) -> Result<Option<StripeConfig>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM stripe_config WHERE id = 1",
            STRIPE_CONFIG_COLS
        ),
        [],
    )
}

/// Upsert the single Stripe config row. A secret field carrying the mask
/// sentinel keeps the stored value; an absent field clears nothing either.
pub fn upsert_stripe_config(conn: &Connection, input: &UpdateStripeConfig) -> Result<StripeConfig> {
    let existing = get_stripe_config(conn)?;

    let keep_or = |incoming: &Option<String>, stored: Option<String>| -> Option<String> {
        match incoming {
            Some(v) if v == MASKED_SECRET => stored,
            Some(v) => Some(v.clone()),
            None => stored,
        }
    };

    let secret_key = keep_or(
        &input.secret_key,
        existing.as_ref().and_then(|c| c.secret_key.clone()),
    );
    let webhook_secret = keep_or(
        &input.webhook_secret,
        existing.as_ref().and_then(|c| c.webhook_secret.clone()),
    );
    let publishable_key = input
        .publishable_key
        .clone()
        .or_else(|| existing.as_ref().and_then(|c| c.publishable_key.clone()));
    let regular_price_id = input
        .regular_price_id
        .clone()
        .or_else(|| existing.as_ref().and_then(|c| c.regular_price_id.clone()));
    let extended_price_id = input
        .extended_price_id
        .clone()
        .or_else(|| existing.as_ref().and_then(|c| c.extended_price_id.clone()));
    let live_mode = input
        .live_mode
        .or(existing.as_ref().map(|c| c.live_mode))
        .unwrap_or(false);

    conn.execute(
        "INSERT INTO stripe_config (id, publishable_key, secret_key, webhook_secret,
            regular_price_id, extended_price_id, live_mode, updated_at)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
            publishable_key = ?1, secret_key = ?2, webhook_secret = ?3,
            regular_price_id = ?4, extended_price_id = ?5, live_mode = ?6, updated_at = ?7",
        params![
            &publishable_key,
            &secret_key,
            &webhook_secret,
            &regular_price_id,
            &extended_price_id,
            live_mode,
            now(),
        ],
    )?;

    get_stripe_config(conn)?
        .ok_or_else(|| AppError::Internal("Stripe config not found after upsert".into()))
}

pub fn get_mail_config(conn: &Connection) -> Result<Option<MailConfig>> {
    query_one(
        conn,
        &format!("SELECT {} FROM mail_config WHERE id = 1", MAIL_CONFIG_COLS),
        [],
    )
}

pub fn upsert_mail_config(conn: &Connection, input: &UpdateMailConfig) -> Result<MailConfig> {
    let existing = get_mail_config(conn)?;

    let api_key = match &input.api_key {
        Some(v) if v == MASKED_SECRET => existing.as_ref().and_then(|c| c.api_key.clone()),
        Some(v) => Some(v.clone()),
        None => existing.as_ref().and_then(|c| c.api_key.clone()),
    };

    conn.execute(
        "INSERT INTO mail_config (id, api_key, from_email, from_name, reply_to, enabled, updated_at)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
            api_key = ?1, from_email = ?2, from_name = ?3, reply_to = ?4,
            enabled = ?5, updated_at = ?6",
        params![
            &api_key,
            &input.from_email,
            &input.from_name,
            &input.reply_to,
            input.enabled,
            now(),
        ],
    )?;

    get_mail_config(conn)?
        .ok_or_else(|| AppError::Internal("Mail config not found after upsert".into()))
}

pub fn delete_mail_config(conn: &Connection) -> Result<bool> {
    let affected = conn.execute("DELETE FROM mail_config WHERE id = 1", [])?;
    Ok(affected > 0)
}

// ============ Webhook log ============

/// Record a received webhook event. Returns false when the event id was
/// already recorded (duplicate delivery) so the caller can skip processing.
pub fn record_webhook_event(conn: &Connection, event_id: &str, event_type: &str) -> Result<bool> {
    let result = conn.execute(
        "INSERT INTO webhook_log (id, event_id, event_type, processed, created_at)
         VALUES (?1, ?2, ?3, 0, ?4)",
        params![gen_id(), event_id, event_type, now()],
    );

    match result {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn mark_webhook_processed(
    conn: &Connection,
    event_id: &str,
    error: Option<&str>,
) -> Result<()> {
    conn.execute(
        "UPDATE webhook_log SET processed = 1, error = ?2 WHERE event_id = ?1",
        params![event_id, error],
    )?;
    Ok(())
}
