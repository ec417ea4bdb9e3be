//! Mapping from domain failures to HTTP responses.

use crate::token::TokenError;
use crate::youtube::UpstreamError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::Value;

const MISSING_TOKEN_MESSAGE: &str =
    "Missing/invalid OAuth token. Authorize once and set YT_REFRESH_TOKEN in .env";
const UPSTREAM_UNAUTHORIZED_MESSAGE: &str =
    "Unauthorized: token missing/expired/invalid or missing scope";
const UPSTREAM_FORBIDDEN_MESSAGE: &str =
    "Forbidden: likely not comment owner or channel owner";

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

/// Application error types for the companion API
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    ServerError(String),
    /// No usable token, or upstream rejected the token (401).
    Unauthorized {
        message: String,
        details: Option<Value>,
    },
    /// Token accepted but not allowed to act on the resource (403).
    Forbidden {
        message: String,
        details: Option<Value>,
    },
    BadGateway(String),
    GatewayTimeout(String),
    /// Any other upstream status, passed through with its body.
    Upstream { status: StatusCode, body: Value },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, Value::String(msg), None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, Value::String(msg), None),
            AppError::ServerError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Value::String(msg), None)
            }
            AppError::Unauthorized { message, details } => {
                (StatusCode::UNAUTHORIZED, Value::String(message), details)
            }
            AppError::Forbidden { message, details } => {
                (StatusCode::FORBIDDEN, Value::String(message), details)
            }
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, Value::String(msg), None),
            AppError::GatewayTimeout(msg) => {
                (StatusCode::GATEWAY_TIMEOUT, Value::String(msg), None)
            }
            AppError::Upstream { status, body } => (status, body, None),
        };

        (status, Json(ErrorResponse { error, details })).into_response()
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        if e.is_authorization_failure() {
            return AppError::Unauthorized {
                message: MISSING_TOKEN_MESSAGE.to_string(),
                details: Some(Value::String(e.to_string())),
            };
        }
        match e {
            TokenError::Timeout(_) => AppError::GatewayTimeout(e.to_string()),
            _ => AppError::BadGateway(e.to_string()),
        }
    }
}

impl From<UpstreamError> for AppError {
    fn from(e: UpstreamError) -> Self {
        match e {
            UpstreamError::Token(token_error) => token_error.into(),
            UpstreamError::Status { status, body } => match status.as_u16() {
                401 => AppError::Unauthorized {
                    message: UPSTREAM_UNAUTHORIZED_MESSAGE.to_string(),
                    details: Some(body),
                },
                403 => AppError::Forbidden {
                    message: UPSTREAM_FORBIDDEN_MESSAGE.to_string(),
                    details: Some(body),
                },
                code => AppError::Upstream {
                    status: StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY),
                    body,
                },
            },
            UpstreamError::Transport(msg) => AppError::BadGateway(msg),
            UpstreamError::NotFound(msg) => AppError::NotFound(msg),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::ServerError(format!("{:#}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_token_errors_map_to_statuses() {
        assert_eq!(
            status_of(TokenError::Configuration("CLIENT_SECRET".into()).into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(TokenError::UpstreamAuth("invalid_grant".into()).into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(TokenError::Network("refused".into()).into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(TokenError::Timeout(std::time::Duration::from_secs(10)).into()),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_upstream_401_and_403_stay_distinct() {
        let unauthorized: AppError = UpstreamError::Status {
            status: reqwest::StatusCode::UNAUTHORIZED,
            body: json!({ "error": { "code": 401 } }),
        }
        .into();
        let forbidden: AppError = UpstreamError::Status {
            status: reqwest::StatusCode::FORBIDDEN,
            body: json!({ "error": { "code": 403 } }),
        }
        .into();

        assert!(matches!(unauthorized, AppError::Unauthorized { .. }));
        assert!(matches!(forbidden, AppError::Forbidden { .. }));
    }

    #[test]
    fn test_upstream_status_passthrough() {
        let err: AppError = UpstreamError::Status {
            status: reqwest::StatusCode::TOO_MANY_REQUESTS,
            body: json!({ "error": { "code": 429 } }),
        }
        .into();
        assert_eq!(status_of(err), StatusCode::TOO_MANY_REQUESTS);
    }
}
