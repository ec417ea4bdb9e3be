//! One-time OAuth consent flow for obtaining the long-lived refresh token.
//!
//! Used by the `oauth-helper` binary:
//! 1. Operator opens `/auth` and follows the Google consent link
//! 2. Google redirects to `/oauth2callback?code=...&state=...`
//! 3. The code is exchanged for tokens (`grant_type=authorization_code`)
//! 4. Operator copies `refresh_token` into `YT_REFRESH_TOKEN`

mod exchange;
mod state;

pub use exchange::{exchange_code_for_token, TokenSet};
pub use state::{run_state_cleanup, StateManager};

use crate::token::GOOGLE_TOKEN_URL;

/// Google's OAuth 2.0 authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Scope needed to manage comments and video metadata.
pub const YOUTUBE_FORCE_SSL_SCOPE: &str = "https://www.googleapis.com/auth/youtube.force-ssl";

/// Default callback, matching the redirect URI registered for the client.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:5000/oauth2callback";

/// OAuth client configuration for the consent flow
#[derive(Clone, Debug)]
pub struct ConsentConfig {
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl ConsentConfig {
    /// Google endpoints with the `youtube.force-ssl` scope.
    pub fn google(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            scopes: vec![YOUTUBE_FORCE_SSL_SCOPE.to_string()],
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    /// Build the consent URL.
    ///
    /// `access_type=offline` together with `prompt=consent` makes Google
    /// issue a refresh token even if the account granted access before.
    pub fn build_auth_url(&self, state: &str) -> String {
        let scopes = self.scopes.join(" ");
        format!(
            "{}?client_id={}&redirect_uri={}&scope={}&state={}&response_type=code&access_type=offline&prompt=consent",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&scopes),
            urlencoding::encode(state)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_google_defaults() {
        let config = ConsentConfig::google(
            "id".to_string(),
            "secret".to_string(),
            DEFAULT_REDIRECT_URI.to_string(),
        );
        assert_eq!(config.token_url, "https://oauth2.googleapis.com/token");
        assert_eq!(config.scopes, vec![YOUTUBE_FORCE_SSL_SCOPE]);
    }

    #[test]
    fn test_build_auth_url() {
        let config = ConsentConfig {
            auth_url: "https://example.com/oauth/authorize".to_string(),
            token_url: "https://example.com/oauth/token".to_string(),
            scopes: vec!["read".to_string(), "write".to_string()],
            client_id: "test_client_id".to_string(),
            client_secret: "test_secret".to_string(),
            redirect_uri: "http://localhost:5000/oauth2callback".to_string(),
        };

        let url = config.build_auth_url("random_state");

        assert!(url.starts_with("https://example.com/oauth/authorize?"));
        assert!(url.contains("client_id=test_client_id"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A5000%2Foauth2callback"));
        assert!(url.contains("scope=read%20write"));
        assert!(url.contains("state=random_state"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        assert!(!url.contains("test_secret"));
    }
}
