use anyhow::{Context, Result};
use oauth_helper::api::{create_router, HelperState};
use oauth_helper::port_from_redirect_uri;
use tracing::info;
use yt_companion::oauth::{run_state_cleanup, ConsentConfig, StateManager, DEFAULT_REDIRECT_URI};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oauth_helper=info,yt_companion=info".into()),
        )
        .init();

    let client_id = std::env::var("CLIENT_ID").context("CLIENT_ID is required")?;
    let client_secret = std::env::var("CLIENT_SECRET").context("CLIENT_SECRET is required")?;
    let redirect_uri = std::env::var("OAUTH_REDIRECT_URI")
        .unwrap_or_else(|_| DEFAULT_REDIRECT_URI.to_string());
    let port = port_from_redirect_uri(&redirect_uri)?;

    info!(redirect_uri = %redirect_uri, port = port, "Configuration loaded");

    // States expire after 10 minutes
    let state_manager = StateManager::new(600);
    tokio::spawn(run_state_cleanup(state_manager.clone(), 300));

    let router = create_router(HelperState {
        consent: ConsentConfig::google(client_id, client_secret, redirect_uri),
        state_manager,
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .context("Failed to bind OAuth helper port")?;
    info!("Open http://localhost:{}/auth to authorize", port);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "OAuth helper server error");
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");
    server_handle.abort();

    Ok(())
}
