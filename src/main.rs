use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use yt_companion::api::{create_router, NotesAppState, YouTubeAppState};
use yt_companion::audit::AuditLog;
use yt_companion::config::{load_config, seed_token_from_env, CompanionConfig};
use yt_companion::notes::NoteStore;
use yt_companion::token::{Clock, OAuthCredentials, SystemClock, TokenProvider, TokenRefresher};
use yt_companion::youtube::{DeleteFallback, YouTubeClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yt_companion=info".into()),
        )
        .init();

    info!("YouTube companion starting...");

    let mut config = match std::env::var("COMPANION_CONFIG") {
        Ok(path) => {
            info!(path = %path, "Loading configuration file");
            load_config(&path)?
        }
        Err(_) => CompanionConfig::default(),
    };
    config.apply_env()?;

    info!(
        port = config.server.port,
        video_id = ?config.youtube.video_id,
        database = %config.storage.database_path,
        api_key = config.youtube.api_key.is_some(),
        "Configuration loaded"
    );

    // Missing secrets are reported per request as configuration errors
    let credentials = OAuthCredentials::from_env();
    let missing = credentials.missing();
    if !missing.is_empty() {
        warn!(
            missing = ?missing,
            "OAuth credentials incomplete; authenticated YouTube calls will fail"
        );
    }

    let refresher = TokenRefresher::with_token_url(credentials, config.youtube.token_url.clone())
        .with_timeout(Duration::from_secs(config.youtube.refresh_timeout_seconds));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let tokens = Arc::new(match seed_token_from_env() {
        Some(seed) => {
            info!(expires_at = %seed.expires_at, "Seeding access token from environment");
            TokenProvider::seeded(refresher, clock, seed.access_token, seed.expires_at)
        }
        None => TokenProvider::new(refresher, clock),
    });

    let client = Arc::new(
        YouTubeClient::new(config.youtube.api_base_url.clone(), Arc::clone(&tokens))
            .with_api_key(config.youtube.api_key.clone())
            .with_comments_safety_limit(config.youtube.comments_safety_limit),
    );

    let notes = Arc::new(
        NoteStore::new(&config.storage.database_path)
            .context("Failed to initialize note store")?,
    );
    let audit = Arc::new(
        AuditLog::new(&config.storage.database_path)
            .context("Failed to initialize audit log")?,
    );
    info!("Storage initialized");

    let youtube_state = YouTubeAppState {
        client,
        audit: Arc::clone(&audit),
        video_id: config.youtube.video_id.clone(),
        delete_fallback: DeleteFallback::default(),
    };
    let notes_state = NotesAppState {
        store: notes,
        audit,
        video_id: config.youtube.video_id.clone(),
    };

    let router = create_router(
        youtube_state,
        notes_state,
        &config.server.allowed_origins(),
    );

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.server.port))
        .await
        .context("Failed to bind HTTP port")?;
    info!(port = config.server.port, "Companion API listening");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "HTTP server error");
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    server_handle.abort();
    info!("YouTube companion stopped");

    Ok(())
}
