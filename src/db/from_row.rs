//! Row-mapping helpers: column lists and `FromRow` implementations kept next
//! to each other so a schema change only touches one place.

use rusqlite::{Connection, Params, Row};
use std::str::FromStr;

use crate::error::Result;
use crate::models::*;

pub trait FromRow: Sized {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

pub fn query_one<T: FromRow, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Option<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query_map(params, |row| T::from_row(row))?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub fn query_all<T: FromRow, P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| T::from_row(row))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn parse_json(raw: Option<String>) -> serde_json::Value {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or(serde_json::Value::Null)
}

pub const PRODUCT_COLS: &str = "id, name, description, license_type, price_cents, currency, \
     domain_limit, download_limit, support_days, updates_days, features, \
     stripe_price_id, active, created_at, updated_at";

impl FromRow for Product {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Product {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            license_type: row.get(3)?,
            price_cents: row.get(4)?,
            currency: row.get(5)?,
            domain_limit: row.get(6)?,
            download_limit: row.get(7)?,
            support_days: row.get(8)?,
            updates_days: row.get(9)?,
            features: parse_json(row.get(10)?),
            stripe_price_id: row.get(11)?,
            active: row.get(12)?,
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
        })
    }
}

pub const SALE_COLS: &str = "id, stripe_session_id, stripe_payment_id, customer_email, \
     customer_name, amount_cents, currency, product_id, license_key, status, \
     download_count, last_download_at, metadata, created_at, updated_at";

impl FromRow for Sale {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let status: String = row.get(9)?;
        Ok(Sale {
            id: row.get(0)?,
            stripe_session_id: row.get(1)?,
            stripe_payment_id: row.get(2)?,
            customer_email: row.get(3)?,
            customer_name: row.get(4)?,
            amount_cents: row.get(5)?,
            currency: row.get(6)?,
            product_id: row.get(7)?,
            license_key: row.get(8)?,
            status: SaleStatus::from_str(&status).map_err(|_| {
                rusqlite::Error::InvalidColumnType(9, "status".into(), rusqlite::types::Type::Text)
            })?,
            download_count: row.get(10)?,
            last_download_at: row.get(11)?,
            metadata: parse_json(row.get(12)?),
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
        })
    }
}

/// Sale columns prefixed `s.` followed by product columns prefixed `p.`,
/// for `sales s JOIN products p ON p.id = s.product_id` queries.
pub const SALE_WITH_PRODUCT_COLS: &str =
    "s.id, s.stripe_session_id, s.stripe_payment_id, s.customer_email, \
     s.customer_name, s.amount_cents, s.currency, s.product_id, s.license_key, s.status, \
     s.download_count, s.last_download_at, s.metadata, s.created_at, s.updated_at, \
     p.id, p.name, p.description, p.license_type, p.price_cents, p.currency, \
     p.domain_limit, p.download_limit, p.support_days, p.updates_days, p.features, \
     p.stripe_price_id, p.active, p.created_at, p.updated_at";

impl FromRow for SaleWithProduct {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let sale = Sale::from_row(row)?;
        let product = Product {
            id: row.get(15)?,
            name: row.get(16)?,
            description: row.get(17)?,
            license_type: row.get(18)?,
            price_cents: row.get(19)?,
            currency: row.get(20)?,
            domain_limit: row.get(21)?,
            download_limit: row.get(22)?,
            support_days: row.get(23)?,
            updates_days: row.get(24)?,
            features: parse_json(row.get(25)?),
            stripe_price_id: row.get(26)?,
            active: row.get(27)?,
            created_at: row.get(28)?,
            updated_at: row.get(29)?,
        };
        Ok(SaleWithProduct { sale, product })
    }
}

pub const ACTIVATION_COLS: &str =
    "id, license_key, domain, is_active, created_at, last_seen_at";

impl FromRow for LicenseActivation {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(LicenseActivation {
            id: row.get(0)?,
            license_key: row.get(1)?,
            domain: row.get(2)?,
            is_active: row.get(3)?,
            created_at: row.get(4)?,
            last_seen_at: row.get(5)?,
        })
    }
}

pub const DOWNLOAD_COLS: &str =
    "id, sale_id, file_name, file_path, file_size, ip_address, user_agent, downloaded_at";

impl FromRow for Download {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Download {
            id: row.get(0)?,
            sale_id: row.get(1)?,
            file_name: row.get(2)?,
            file_path: row.get(3)?,
            file_size: row.get(4)?,
            ip_address: row.get(5)?,
            user_agent: row.get(6)?,
            downloaded_at: row.get(7)?,
        })
    }
}

pub const ADMIN_USER_COLS: &str = "id, email, password_hash, created_at";

impl FromRow for AdminUser {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(AdminUser {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

pub const ADMIN_SESSION_COLS: &str = "id, admin_id, token_hash, expires_at, created_at";

impl FromRow for AdminSession {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(AdminSession {
            id: row.get(0)?,
            admin_id: row.get(1)?,
            token_hash: row.get(2)?,
            expires_at: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

pub const STRIPE_CONFIG_COLS: &str = "publishable_key, secret_key, webhook_secret, \
     regular_price_id, extended_price_id, live_mode, updated_at";

impl FromRow for StripeConfig {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(StripeConfig {
            publishable_key: row.get(0)?,
            secret_key: row.get(1)?,
            webhook_secret: row.get(2)?,
            regular_price_id: row.get(3)?,
            extended_price_id: row.get(4)?,
            live_mode: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

pub const MAIL_CONFIG_COLS: &str =
    "api_key, from_email, from_name, reply_to, enabled, updated_at";

impl FromRow for MailConfig {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(MailConfig {
            api_key: row.get(0)?,
            from_email: row.get(1)?,
            from_name: row.get(2)?,
            reply_to: row.get(3)?,
            enabled: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}
