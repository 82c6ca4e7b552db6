use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tracing_subscriber::EnvFilter;

use keyfront::config::Config;
use keyfront::db::{self, AppState, queries};
use keyfront::email::EmailService;

#[derive(Parser)]
#[command(name = "keyfront", about = "License storefront server", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create the first admin account from the command line
    BootstrapAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::BootstrapAdmin { email, password } => bootstrap_admin(config, &email, &password),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    if config.dev_mode {
        tracing::warn!("Running in dev mode");
    }
    if config.download_token_secret == "change-me-in-production" && !config.dev_mode {
        tracing::warn!("DOWNLOAD_TOKEN_SECRET is the built-in default; set a real secret");
    }

    let pool = db::init_pool(&config.database_path)
        .with_context(|| format!("opening database at {}", config.database_path))?;

    let state = AppState {
        db: pool,
        email: EmailService::new(),
        base_url: config.base_url.clone(),
        downloads_dir: PathBuf::from(&config.downloads_dir),
        download_token_secret: config.download_token_secret.clone(),
        license_key_prefix: config.license_key_prefix.clone(),
    };

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(50)
            .finish()
            .ok_or_else(|| anyhow!("invalid rate limit configuration"))?,
    );

    let app = keyfront::app(state).layer(GovernorLayer::new(governor_conf));

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!(addr = %addr, base_url = %config.base_url, "keyfront listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .context("server error")
}

fn bootstrap_admin(config: Config, email: &str, password: &str) -> anyhow::Result<()> {
    let pool = db::init_pool(&config.database_path)
        .with_context(|| format!("opening database at {}", config.database_path))?;
    let conn = pool.get()?;

    if queries::count_admins(&conn)? > 0 {
        return Err(anyhow!("an admin account already exists"));
    }

    let admin = queries::create_admin(&conn, email, password)?;
    tracing::info!(email = %admin.email, "Admin account created");
    println!("Admin account created: {}", admin.email);
    Ok(())
}
