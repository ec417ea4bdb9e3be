//! Authorization-code exchange.

use super::ConsentConfig;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

/// Tokens returned by the authorization-code grant.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

/// Exchange authorization code for access and refresh tokens
///
/// # Arguments
/// * `config` - Client credentials, token endpoint and redirect URI
/// * `code` - Authorization code from callback
///
/// # Returns
/// * `Ok(TokenSet)` - Tokens as issued
/// * `Err` - If the request fails or the endpoint rejects the code
pub async fn exchange_code_for_token(config: &ConsentConfig, code: &str) -> Result<TokenSet> {
    let client = reqwest::Client::new();

    let form_data = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
    ];

    tracing::debug!("Exchanging authorization code for token at {}", config.token_url);

    let response = client
        .post(&config.token_url)
        .header("Accept", "application/json")
        .form(&form_data)
        .send()
        .await
        .context("Failed to send token exchange request")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        return Err(anyhow!(
            "Token exchange failed with status {}: {}",
            status,
            body
        ));
    }

    let tokens: TokenSet = response
        .json()
        .await
        .context("Failed to parse token response")?;

    tracing::debug!(
        "Token exchange successful, has_refresh_token={}, expires_in={:?}",
        tokens.refresh_token.is_some(),
        tokens.expires_in
    );

    Ok(tokens)
}
