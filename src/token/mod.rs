//! OAuth2 access-token lifecycle for the server-held YouTube credential.
//!
//! A single refresh token (configured once at startup) is exchanged for
//! short-lived access tokens on demand. Tokens are cached in memory and
//! reused until they come within [`EXPIRY_SKEW_SECONDS`] of their expiry.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       TokenProvider                      │
//! │  - get_access_token (lazy refresh)       │
//! │  - force_refresh (after upstream 401)    │
//! │  - single-flight guard                   │
//! └─────────────────────────────────────────┘
//!          ↓                    ↑
//!    (stale / forced)      (token, ttl)
//!          ↓                    ↑
//! ┌─────────────────────────────────────────┐
//! │       TokenRefresher                     │
//! │  - refresh_token grant                   │
//! │  - bounded timeout                       │
//! └─────────────────────────────────────────┘
//!          ↓ (replace pair)
//! ┌─────────────────────────────────────────┐
//! │       TokenCache                         │
//! │  - (access_token, expires_at) in memory  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use yt_companion::token::{OAuthCredentials, SystemClock, TokenProvider, TokenRefresher};
//!
//! # async fn run() -> Result<(), yt_companion::token::TokenError> {
//! let refresher = TokenRefresher::new(OAuthCredentials::from_env());
//! let provider = TokenProvider::new(refresher, Arc::new(SystemClock));
//!
//! let token = provider.get_access_token().await?;
//! # let _ = token;
//! # Ok(())
//! # }
//! ```

use thiserror::Error;

mod cache;
mod clock;
mod provider;
mod refresher;

pub use cache::{CachedToken, TokenCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use provider::TokenProvider;
pub use refresher::{OAuthCredentials, TokenGrant, TokenRefresher, GOOGLE_TOKEN_URL};

/// Safety margin (seconds) subtracted from a token's expiry before it is considered stale.
pub const EXPIRY_SKEW_SECONDS: i64 = 60;

/// Failures from obtaining an access token.
///
/// Every variant is surfaced to the caller; nothing here is retried internally.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Client id, client secret or refresh token is not configured.
    /// Permanent until the process is reconfigured.
    #[error("OAuth configuration missing: {0}")]
    Configuration(String),

    /// The token endpoint answered but gave no usable token
    /// (revoked or stale refresh token, bad client credentials).
    #[error("token endpoint returned no usable token: {0}")]
    UpstreamAuth(String),

    /// Transport failure reaching the token endpoint.
    #[error("token endpoint unreachable: {0}")]
    Network(String),

    /// The refresh exchange exceeded its timeout.
    #[error("token refresh timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl TokenError {
    /// Whether the failure means "not authorized" rather than "upstream unavailable".
    ///
    /// Configuration and upstream-auth failures map to HTTP 401 at the route
    /// boundary; transport failures map to 5xx.
    pub fn is_authorization_failure(&self) -> bool {
        matches!(self, TokenError::Configuration(_) | TokenError::UpstreamAuth(_))
    }
}
