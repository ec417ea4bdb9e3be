//! Consent and callback pages.

use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use yt_companion::oauth::{exchange_code_for_token, ConsentConfig, StateManager, TokenSet};

/// Shared state for the helper routes
#[derive(Clone)]
pub struct HelperState {
    pub consent: ConsentConfig,
    pub state_manager: StateManager,
}

/// OAuth callback query parameters
#[derive(Deserialize)]
pub struct OAuthCallback {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Create helper router
pub fn create_router(state: HelperState) -> Router {
    Router::new()
        .route("/auth", get(auth_page))
        .route("/oauth2callback", get(oauth_callback))
        .with_state(Arc::new(state))
}

#[derive(Template)]
#[template(
    source = r#"<h1>YouTube companion authorization</h1><p><a href="{{ url }}">Authorize with Google</a></p>"#,
    ext = "html"
)]
struct AuthPage<'a> {
    url: &'a str,
}

#[derive(Template)]
#[template(
    source = r#"<h1>Authorization failed</h1><p>{{ message }}</p><p><a href="/auth">Start over</a></p>"#,
    ext = "html"
)]
struct ErrorPage<'a> {
    message: &'a str,
}

#[derive(Template)]
#[template(
    source = r#"<h1>Authorization complete</h1><pre>{{ tokens_json }}</pre>
{% if has_refresh_token %}<p>Copy <code>refresh_token</code> into <code>YT_REFRESH_TOKEN</code> in the backend's environment.</p>
{% else %}<p>No refresh token was issued. Revoke the app's access in your Google account and authorize again.</p>
{% endif %}"#,
    ext = "html"
)]
struct TokensPage<'a> {
    tokens_json: &'a str,
    has_refresh_token: bool,
}

/// Renders `page` with `status`; a template failure becomes a plain 500.
fn render(status: StatusCode, page: &impl Template) -> Response {
    match page.render() {
        Ok(body) => (status, Html(body)).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render page");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn error_page(status: StatusCode, message: &str) -> Response {
    render(status, &ErrorPage { message })
}

fn tokens_page(tokens: &TokenSet) -> Response {
    let tokens_json = serde_json::to_string_pretty(tokens).unwrap_or_default();
    render(
        StatusCode::OK,
        &TokensPage {
            tokens_json: &tokens_json,
            has_refresh_token: tokens.refresh_token.is_some(),
        },
    )
}

/// GET /auth
async fn auth_page(State(state): State<Arc<HelperState>>) -> Response {
    let csrf = state.state_manager.create_state();
    let url = state.consent.build_auth_url(&csrf);
    info!("Issued consent link");
    render(StatusCode::OK, &AuthPage { url: &url })
}

/// GET /oauth2callback?code=&state=
async fn oauth_callback(
    State(state): State<Arc<HelperState>>,
    Query(params): Query<OAuthCallback>,
) -> Response {
    if let Some(error) = params.error {
        warn!(error = %error, "Consent denied");
        return error_page(StatusCode::BAD_REQUEST, &format!("Google returned: {}", error));
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return error_page(StatusCode::BAD_REQUEST, "Missing code");
    };

    let csrf = params.state.unwrap_or_default();
    if !state.state_manager.validate_and_consume(&csrf) {
        warn!("Rejected callback with unknown or expired state");
        return error_page(StatusCode::BAD_REQUEST, "Invalid or expired state");
    }

    match exchange_code_for_token(&state.consent, &code).await {
        Ok(tokens) => {
            info!(
                has_refresh_token = tokens.refresh_token.is_some(),
                "Authorization code exchanged"
            );
            tokens_page(&tokens)
        }
        Err(e) => {
            error!(error = %e, "Token exchange failed");
            error_page(StatusCode::BAD_GATEWAY, &format!("Token exchange failed: {}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;
    use yt_companion::oauth::DEFAULT_REDIRECT_URI;

    fn helper_state(token_url: String) -> HelperState {
        let mut consent = ConsentConfig::google(
            "client".to_string(),
            "secret".to_string(),
            DEFAULT_REDIRECT_URI.to_string(),
        );
        consent.token_url = token_url;
        HelperState {
            consent,
            state_manager: StateManager::new(600),
        }
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_auth_page_links_to_consent() {
        let state = helper_state("http://127.0.0.1:1/token".to_string());
        let manager = state.state_manager.clone();
        let app = create_router(state);

        let response = app.oneshot(get("/auth")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_text(response).await;
        assert!(body.contains("accounts.google.com"));
        assert!(body.contains("access_type=offline"));
        assert!(body.contains("prompt=consent"));
        assert_eq!(manager.count(), 1);
    }

    #[tokio::test]
    async fn test_callback_missing_code() {
        let app = create_router(helper_state("http://127.0.0.1:1/token".to_string()));

        let response = app.oneshot(get("/oauth2callback")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("Missing code"));
    }

    #[tokio::test]
    async fn test_callback_error_is_escaped() {
        let app = create_router(helper_state("http://127.0.0.1:1/token".to_string()));

        let response = app
            .oneshot(get("/oauth2callback?error=%3Cscript%3Ealert(1)%3C%2Fscript%3E"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_text(response).await;
        assert!(body.contains("&lt;script&gt;"));
        assert!(!body.contains("<script>"));
    }

    #[tokio::test]
    async fn test_callback_rejects_unknown_state() {
        let app = create_router(helper_state("http://127.0.0.1:1/token".to_string()));

        let response = app
            .oneshot(get("/oauth2callback?code=abc&state=forged"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_callback_shows_refresh_token() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "at", "refresh_token": "1//refresh", "expires_in": 3599}"#)
            .create_async()
            .await;

        let state = helper_state(format!("{}/token", server.url()));
        let csrf = state.state_manager.create_state();
        let app = create_router(state);

        let response = app
            .oneshot(get(&format!("/oauth2callback?code=abc&state={}", csrf)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_text(response).await;
        assert!(body.contains("1//refresh"));
        assert!(body.contains("YT_REFRESH_TOKEN"));
    }

    #[tokio::test]
    async fn test_callback_exchange_failure_is_bad_gateway() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_grant"}"#)
            .create_async()
            .await;

        let state = helper_state(format!("{}/token", server.url()));
        let csrf = state.state_manager.create_state();
        let app = create_router(state);

        let response = app
            .oneshot(get(&format!("/oauth2callback?code=abc&state={}", csrf)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
