use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub base_url: String,
    /// Directory holding the downloadable module packages
    pub downloads_dir: String,
    /// Secret used to sign download tokens (HMAC-SHA256)
    pub download_token_secret: String,
    /// Prefix for generated license keys (e.g. "PFX")
    pub license_key_prefix: String,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("KEYFRONT_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url = env::var("BASE_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", host, port));

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "keyfront.db".to_string()),
            base_url,
            downloads_dir: env::var("DOWNLOADS_DIR")
                .unwrap_or_else(|_| "downloads".to_string()),
            download_token_secret: env::var("DOWNLOAD_TOKEN_SECRET")
                .unwrap_or_else(|_| "change-me-in-production".to_string()),
            license_key_prefix: env::var("LICENSE_KEY_PREFIX")
                .unwrap_or_else(|_| "PFX".to_string()),
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
