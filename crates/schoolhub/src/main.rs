use std::sync::Arc;

use schoolhub::config::AppConfig;
use schoolhub::db::SchoolDbManager;
use schoolhub::server::create_router;
use schoolhub::types::AppState;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("schoolhub=info")))
        .init();

    let config = AppConfig::from_env()?;
    let db = SchoolDbManager::new(&config.database_path)?;
    info!(path = %config.database_path, "Opened school database");

    let addr = config.socket_addr();
    let auth = config.api_token.is_some();
    let state = Arc::new(AppState::new(db, config));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %listener.local_addr()?, auth, "Server listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
