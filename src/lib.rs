// OAuth access-token cache, refresher and provider
pub mod token;

// YouTube Data API client
pub mod youtube;

// HTTP API (YouTube proxy and notes)
pub mod api;

// Configuration (TOML + environment)
pub mod config;

// Per-video notes
pub mod notes;

// Action audit trail
pub mod audit;

// One-time consent flow for obtaining the refresh token
pub mod oauth;

pub use token::{TokenError, TokenProvider};
pub use youtube::{UpstreamError, YouTubeClient};
