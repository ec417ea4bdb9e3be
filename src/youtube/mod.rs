//! Authenticated dispatch to the YouTube Data API v3.
//!
//! Every call obtains its bearer token from the shared
//! [`TokenProvider`](crate::token::TokenProvider). A 401 from the API triggers
//! one forced refresh and one retry; anything else is returned to the caller
//! with the upstream status and body intact.

use crate::token::TokenError;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

mod client;

pub use client::YouTubeClient;

/// Errors from an upstream YouTube call.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// No access token could be obtained.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The API answered with a non-success status.
    #[error("YouTube API returned {status}")]
    Status { status: StatusCode, body: Value },

    /// The request never produced a response.
    #[error("YouTube API request failed: {0}")]
    Transport(String),

    /// The API answered successfully but without the requested resource.
    #[error("{0}")]
    NotFound(String),
}

/// Where a new comment goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentTarget {
    /// New top-level thread on a video.
    TopLevel { video_id: String },
    /// Reply to an existing comment.
    Reply { parent_id: String },
}

/// What to do when deleting a single comment is rejected with HTTP 400.
///
/// The API addresses a top-level comment through its thread, so a 400 on
/// `comments.delete` usually means the id names a thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeleteFallback {
    /// Retry once as `commentThreads.delete` with the same id.
    #[default]
    ThreadOnBadRequest,
    /// Report the 400 as is.
    Disabled,
}

/// Which resource a successful delete removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Comment,
    CommentThread,
}

/// New title and/or description for a video.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl VideoUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

/// Comment threads gathered across pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThreadPages {
    pub items: Vec<Value>,
    pub next_page_token: Option<String>,
    pub fetched_all: bool,
}

/// Category assigned when the existing snippet has none.
pub const DEFAULT_CATEGORY_ID: &str = "22";

pub(crate) const INVALID_CATEGORY_HINT: &str = "The existing categoryId is invalid. Consider calling /videoCategories.list to get supported categories and update the snippet.categoryId accordingly.";

/// Whether an API error body lists `reason` among its errors.
pub(crate) fn error_has_reason(body: &Value, reason: &str) -> bool {
    body.pointer("/error/errors")
        .and_then(Value::as_array)
        .is_some_and(|errors| {
            errors
                .iter()
                .any(|e| e.get("reason").and_then(Value::as_str) == Some(reason))
        })
}
