use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use stratus::api::{self, AppState};
use stratus::config::Config;
use stratus::secrets::SecretStore;
use stratus::settings::SettingsStore;
use stratus::store::{KvStore, MemoryStore, SqliteStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stratus=info".into()),
        )
        .init();

    // Config file path: first argument, or STRATUS_CONFIG, or defaults
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("STRATUS_CONFIG").ok());
    let config =
        Config::load(config_path.as_deref()).context("Failed to load configuration")?;

    let kv: Arc<dyn KvStore> = if config.db_path == ":memory:" {
        info!("Using in-memory store; state is lost on shutdown");
        Arc::new(MemoryStore::new())
    } else {
        info!(path = %config.db_path, "Opening SQLite store");
        Arc::new(SqliteStore::open(&config.db_path).context("Failed to open store")?)
    };

    let state = AppState {
        secrets: Arc::new(SecretStore::new(
            Arc::clone(&kv),
            config.pepper_secrets.clone(),
        )),
        settings: Arc::new(SettingsStore::new(
            Arc::clone(&kv),
            config.pepper_settings.clone(),
            config.size_limit,
        )),
        provider: config.oauth.clone(),
        allowed_users: config.allowed_users_set(),
    };

    let app = api::create_router(state, config.cors_origins.as_deref());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "stratus listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("stratus stopped");

    Ok(())
}

async fn shutdown_signal() {
    // Must not resolve before a signal arrives: resolving hands the server
    // straight into graceful shutdown
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    info!("Shutdown signal received");
}
