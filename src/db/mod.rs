pub mod from_row;
pub mod queries;

use std::path::PathBuf;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::email::EmailService;
use crate::error::Result;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub email: EmailService,
    pub base_url: String,
    pub downloads_dir: PathBuf,
    pub download_token_secret: String,
    pub license_key_prefix: String,
}

/// Open a pooled connection to the database at `path` and run migrations.
pub fn init_pool(path: &str) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(path).with_init(|conn| {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
    });
    let pool = Pool::new(manager).map_err(crate::error::AppError::Pool)?;
    let conn = pool.get()?;
    migrate(&conn)?;
    Ok(pool)
}

/// Idempotent schema creation. Uniqueness constraints back the core
/// invariants: one sale per license key, one ledger row per (key, domain),
/// one sale per external checkout session.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS products (
            id              TEXT PRIMARY KEY,
            name            TEXT NOT NULL,
            description     TEXT,
            license_type    TEXT NOT NULL,
            price_cents     INTEGER NOT NULL,
            currency        TEXT NOT NULL DEFAULT 'usd',
            domain_limit    INTEGER NOT NULL DEFAULT 1,
            download_limit  INTEGER NOT NULL DEFAULT 10,
            support_days    INTEGER NOT NULL DEFAULT 0,
            updates_days    INTEGER NOT NULL DEFAULT 0,
            features        TEXT,
            stripe_price_id TEXT,
            active          INTEGER NOT NULL DEFAULT 1,
            created_at      INTEGER NOT NULL,
            updated_at      INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sales (
            id                 TEXT PRIMARY KEY,
            stripe_session_id  TEXT UNIQUE,
            stripe_payment_id  TEXT,
            customer_email     TEXT NOT NULL,
            customer_name      TEXT,
            amount_cents       INTEGER NOT NULL,
            currency           TEXT NOT NULL DEFAULT 'usd',
            product_id         TEXT NOT NULL REFERENCES products(id),
            license_key        TEXT NOT NULL UNIQUE,
            status             TEXT NOT NULL DEFAULT 'pending',
            download_count     INTEGER NOT NULL DEFAULT 0,
            last_download_at   INTEGER,
            metadata           TEXT,
            created_at         INTEGER NOT NULL,
            updated_at         INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sales_license_key ON sales(license_key);
        CREATE INDEX IF NOT EXISTS idx_sales_created_at ON sales(created_at);

        CREATE TABLE IF NOT EXISTS license_activations (
            id           TEXT PRIMARY KEY,
            license_key  TEXT NOT NULL REFERENCES sales(license_key),
            domain       TEXT NOT NULL,
            is_active    INTEGER NOT NULL DEFAULT 1,
            created_at   INTEGER NOT NULL,
            last_seen_at INTEGER NOT NULL,
            UNIQUE(license_key, domain)
        );

        CREATE TABLE IF NOT EXISTS downloads (
            id            TEXT PRIMARY KEY,
            sale_id       TEXT NOT NULL REFERENCES sales(id),
            file_name     TEXT NOT NULL,
            file_path     TEXT NOT NULL,
            file_size     INTEGER NOT NULL,
            ip_address    TEXT,
            user_agent    TEXT,
            downloaded_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_downloads_sale_id ON downloads(sale_id);

        CREATE TABLE IF NOT EXISTS admin_users (
            id            TEXT PRIMARY KEY,
            email         TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at    INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS admin_sessions (
            id         TEXT PRIMARY KEY,
            admin_id   TEXT NOT NULL REFERENCES admin_users(id),
            token_hash TEXT NOT NULL UNIQUE,
            expires_at INTEGER NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS stripe_config (
            id                INTEGER PRIMARY KEY CHECK (id = 1),
            publishable_key   TEXT,
            secret_key        TEXT,
            webhook_secret    TEXT,
            regular_price_id  TEXT,
            extended_price_id TEXT,
            live_mode         INTEGER NOT NULL DEFAULT 0,
            updated_at        INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS mail_config (
            id         INTEGER PRIMARY KEY CHECK (id = 1),
            api_key    TEXT,
            from_email TEXT NOT NULL,
            from_name  TEXT NOT NULL,
            reply_to   TEXT,
            enabled    INTEGER NOT NULL DEFAULT 1,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS webhook_log (
            id         TEXT PRIMARY KEY,
            event_id   TEXT NOT NULL UNIQUE,
            event_type TEXT NOT NULL,
            processed  INTEGER NOT NULL DEFAULT 0,
            error      TEXT,
            created_at INTEGER NOT NULL
        );",
    )?;
    Ok(())
}
