//! Refresh-token grant against the OAuth token endpoint.

use super::{Clock, TokenCache, TokenError};
use chrono::TimeDelta;
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;
use tracing::{debug, info, warn};

/// Google's OAuth 2.0 token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Client credentials and the long-lived refresh token.
///
/// Read once at startup and never mutated. Any field may be absent; absence
/// is reported as [`TokenError::Configuration`] at refresh time rather than
/// aborting the process.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
}

impl fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl OAuthCredentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            client_id: Some(client_id.into()),
            client_secret: Some(client_secret.into()),
            refresh_token: Some(refresh_token.into()),
        }
    }

    /// Reads `CLIENT_ID`, `CLIENT_SECRET` and `YT_REFRESH_TOKEN`
    /// (falling back to the legacy `YOUTUBE_REFRESH_TOKEN`).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but with an arbitrary key lookup.
    /// Empty values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            client_id: get("CLIENT_ID"),
            client_secret: get("CLIENT_SECRET"),
            refresh_token: get("YT_REFRESH_TOKEN").or_else(|| get("YOUTUBE_REFRESH_TOKEN")),
        }
    }

    /// Names of the settings that are missing, in configuration-key form.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.client_id.is_none() {
            missing.push("CLIENT_ID");
        }
        if self.client_secret.is_none() {
            missing.push("CLIENT_SECRET");
        }
        if self.refresh_token.is_none() {
            missing.push("YT_REFRESH_TOKEN");
        }
        missing
    }

    fn require(&self) -> Result<(&str, &str, &str), TokenError> {
        match (
            self.client_id.as_deref(),
            self.client_secret.as_deref(),
            self.refresh_token.as_deref(),
        ) {
            (Some(id), Some(secret), Some(refresh)) => Ok((id, secret, refresh)),
            _ => Err(TokenError::Configuration(self.missing().join(", "))),
        }
    }
}

/// Token endpoint response. Both fields are required for a usable grant but
/// are parsed leniently so their absence can be reported precisely.
#[derive(Deserialize, Debug)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
}

/// A freshly issued access token and its lifetime in seconds.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub expires_in: i64,
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Exchanges the refresh token for access tokens.
///
/// Each call either fully succeeds and replaces the cached pair, or fails and
/// leaves the cache as it was.
pub struct TokenRefresher {
    credentials: OAuthCredentials,
    token_url: String,
    timeout: std::time::Duration,
    http_client: reqwest::Client,
}

impl TokenRefresher {
    /// Refresher against Google's token endpoint with the default 10 second timeout.
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self::with_token_url(credentials, GOOGLE_TOKEN_URL.to_string())
    }

    /// Refresher against a custom token endpoint (for testing with a stub server).
    pub fn with_token_url(credentials: OAuthCredentials, token_url: String) -> Self {
        Self {
            credentials,
            token_url,
            timeout: DEFAULT_TIMEOUT,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Performs one refresh-token grant and returns the new token.
    ///
    /// Configuration is checked before any network access.
    pub async fn exchange(&self) -> Result<TokenGrant, TokenError> {
        let (client_id, client_secret, refresh_token) = self.credentials.require()?;

        let form_data = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        debug!(token_url = %self.token_url, "Requesting access token refresh");

        let response = self
            .http_client
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&form_data)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Token endpoint rejected refresh");
            return Err(match status {
                // invalid_grant / invalid_client: needs operator action, not a retry
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                    TokenError::UpstreamAuth(format!("token endpoint returned {}: {}", status, body))
                }
                _ => TokenError::Network(format!("token endpoint returned {}", status)),
            });
        }

        let token_response: TokenResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                TokenError::Timeout(self.timeout)
            } else {
                TokenError::UpstreamAuth(format!("malformed token response: {}", e))
            }
        })?;

        let access_token = token_response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TokenError::UpstreamAuth("response has no access_token".to_string()))?;
        let expires_in = token_response
            .expires_in
            .ok_or_else(|| TokenError::UpstreamAuth("response has no expires_in".to_string()))?;
        if expires_in <= 0 {
            return Err(TokenError::UpstreamAuth(format!(
                "invalid expires_in: {}",
                expires_in
            )));
        }

        debug!(
            expires_in = expires_in,
            token_type = ?token_response.token_type,
            "Token refresh successful"
        );

        Ok(TokenGrant {
            access_token,
            expires_in,
        })
    }

    /// Exchanges and, on success, writes `(token, now + ttl)` into `cache`.
    pub async fn refresh(&self, cache: &TokenCache, clock: &dyn Clock) -> Result<String, TokenError> {
        let grant = self.exchange().await?;
        let now = clock.now();
        let expires_at = TimeDelta::try_seconds(grant.expires_in)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                TokenError::UpstreamAuth(format!("invalid expires_in: {}", grant.expires_in))
            })?;
        cache.replace(grant.access_token.clone(), expires_at);

        info!(
            expires_in = grant.expires_in,
            expires_at = %expires_at.to_rfc3339(),
            "Access token refreshed"
        );

        Ok(grant.access_token)
    }

    fn transport_error(&self, e: reqwest::Error) -> TokenError {
        if e.is_timeout() {
            TokenError::Timeout(self.timeout)
        } else {
            TokenError::Network(e.to_string())
        }
    }
}
