//! Concierge Server - Main Entry Point

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use concierge_server::{api, config, slack};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "concierge_server=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Concierge server"
    );

    // Misconfiguration is not fatal, but it should be loud at startup.
    if config.signing_secret.is_none() {
        warn!("SLACK_SIGNING_SECRET is not set; all webhook requests will be rejected");
    }
    if config.usergroup_ids.is_empty() {
        warn!("SLACK_USERGROUP_IDS is empty; events will be acknowledged without syncing");
    }

    // Outbound platform API client
    let client = slack::SlackClient::new(&config.api_base_url, &config.bot_token)?;

    // Build application state and router
    let state = api::AppState::new(config.clone(), Arc::new(client));
    let app = api::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Server listening");

    // Graceful shutdown handler
    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Received shutdown signal, shutting down...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");

    Ok(())
}
