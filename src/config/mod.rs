use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::token::GOOGLE_TOKEN_URL;

/// Origins always allowed by CORS, in addition to `CORS_ORIGIN`.
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "http://localhost:5173",
    "https://youtube-companion-dashboard-cactro.vercel.app",
];

/// Complete companion configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanionConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub youtube: YouTubeConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Extra allowed origins; merged with [`DEFAULT_CORS_ORIGINS`]
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_port() -> u16 {
    7000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Configured origins followed by the defaults, without duplicates.
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins: Vec<String> = Vec::new();
        let configured = self.cors_origins.iter().map(String::as_str);
        for origin in configured.chain(DEFAULT_CORS_ORIGINS.iter().copied()) {
            if !origins.iter().any(|o| o == origin) {
                origins.push(origin.to_string());
            }
        }
        origins
    }
}

/// Upstream YouTube Data API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct YouTubeConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// Video the dashboard manages; used when a request names none
    #[serde(default)]
    pub video_id: Option<String>,
    /// API key for unauthenticated reads when no token is available
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_refresh_timeout")]
    pub refresh_timeout_seconds: u64,
    /// Upper bound on comment threads collected by `?all=true`
    #[serde(default = "default_comments_safety_limit")]
    pub comments_safety_limit: usize,
}

fn default_api_base_url() -> String {
    "https://www.googleapis.com/youtube/v3".to_string()
}

fn default_token_url() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

fn default_refresh_timeout() -> u64 {
    10
}

fn default_comments_safety_limit() -> usize {
    1000
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            token_url: default_token_url(),
            video_id: None,
            api_key: None,
            refresh_timeout_seconds: default_refresh_timeout(),
            comments_safety_limit: default_comments_safety_limit(),
        }
    }
}

/// Note and audit log storage
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

fn default_database_path() -> String {
    "companion.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

impl CompanionConfig {
    /// Overlays environment variables on top of file/default values.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`apply_env`](Self::apply_env) with an arbitrary key lookup.
    pub fn apply_lookup<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(port) = get("PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("PORT must be a valid port number, got '{}'", port))?;
        }
        if let Some(origins) = get("CORS_ORIGIN") {
            self.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(video_id) = get("VIDEO_ID") {
            self.youtube.video_id = Some(video_id);
        }
        if let Some(api_key) = get("YOUTUBE_API_KEY") {
            self.youtube.api_key = Some(api_key);
        }
        if let Some(path) = get("COMPANION_DB") {
            self.storage.database_path = path;
        }
        Ok(())
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<CompanionConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    let config: CompanionConfig =
        toml::from_str(&contents).with_context(|| format!("Failed to parse config file {}", path))?;
    Ok(config)
}

/// Access token persisted from a previous run, used to skip the first refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Reads `YOUTUBE_ACCESS_TOKEN` and `YT_ACCESS_EXPIRY` (epoch milliseconds).
///
/// Both must be present and parseable; otherwise there is no seed.
pub fn seed_token_from_lookup<F>(lookup: F) -> Option<SeedToken>
where
    F: Fn(&str) -> Option<String>,
{
    let access_token = lookup("YOUTUBE_ACCESS_TOKEN").filter(|t| !t.is_empty())?;
    let expiry_ms: i64 = lookup("YT_ACCESS_EXPIRY")?.trim().parse().ok()?;
    let expires_at = DateTime::from_timestamp_millis(expiry_ms)?;
    Some(SeedToken {
        access_token,
        expires_at,
    })
}

pub fn seed_token_from_env() -> Option<SeedToken> {
    seed_token_from_lookup(|key| std::env::var(key).ok())
}
