//! One-shot helper for obtaining the YouTube refresh token.
//!
//! # Flow
//!
//! ```text
//! Operator ──GET /auth──▶ consent link (offline access, force-ssl scope)
//!                              │
//!                   Google consent screen
//!                              │
//!          GET /oauth2callback?code=&state= ◀──┘
//!                              │
//!             authorization_code exchange
//!                              │
//!      refresh_token shown ─▶ copy into YT_REFRESH_TOKEN
//! ```

pub mod api;

use anyhow::{Context, Result};
use reqwest::Url;

/// Port the helper listens on, taken from the redirect URI.
///
/// Falls back to the scheme default (80/443) when the URI has no explicit port.
pub fn port_from_redirect_uri(redirect_uri: &str) -> Result<u16> {
    let url = Url::parse(redirect_uri)
        .with_context(|| format!("OAUTH_REDIRECT_URI is not a valid URL: {}", redirect_uri))?;
    url.port_or_known_default()
        .with_context(|| format!("OAUTH_REDIRECT_URI has no usable port: {}", redirect_uri))
}
