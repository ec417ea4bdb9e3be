//! YouTube proxy endpoints.
//!
//! Reads pass through to the Data API (falling back to the API key when no
//! token is available); writes always require the server-held OAuth token.

use super::AppError;
use crate::audit::{AuditAction, AuditLog};
use crate::youtube::{CommentTarget, DeleteFallback, DeleteOutcome, VideoUpdate, YouTubeClient};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

const DEFAULT_MAX_RESULTS: u32 = 50;
const MAX_RESULTS_CAP: u32 = 100;

/// Shared application state for the YouTube proxy API
#[derive(Clone)]
pub struct YouTubeAppState {
    pub client: Arc<YouTubeClient>,
    pub audit: Arc<AuditLog>,
    /// Video managed by this dashboard
    pub video_id: Option<String>,
    pub delete_fallback: DeleteFallback,
}

impl YouTubeAppState {
    fn configured_video_id(&self) -> Result<&str, AppError> {
        self.video_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::BadRequest("Missing VIDEO_ID in env".to_string()))
    }
}

/// Query for GET /api/video
#[derive(Deserialize)]
pub struct VideoQuery {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

/// Body for PUT /api/video
#[derive(Deserialize)]
pub struct UpdateVideoRequest {
    title: Option<String>,
    description: Option<String>,
}

/// Query for GET /api/comments
#[derive(Deserialize)]
pub struct CommentsQuery {
    #[serde(rename = "maxResults")]
    max_results: Option<String>,
    #[serde(rename = "pageToken")]
    page_token: Option<String>,
    all: Option<String>,
}

impl CommentsQuery {
    /// Requested page size, defaulting to 50 and clamped to 1..=100.
    fn page_size(&self) -> u32 {
        self.max_results
            .as_deref()
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_RESULTS)
            .clamp(1, MAX_RESULTS_CAP)
    }

    fn wants_all(&self) -> bool {
        self.all.as_deref() == Some("true")
    }
}

/// Body for POST /api/comment
#[derive(Deserialize)]
pub struct PostCommentRequest {
    text: Option<String>,
    #[serde(rename = "parentId")]
    parent_id: Option<String>,
}

/// Create YouTube proxy router
pub fn create_youtube_router(state: YouTubeAppState) -> Router {
    Router::new()
        .route("/api/video", get(get_video).put(update_video))
        .route("/api/comments", get(list_comments))
        .route("/api/comment", post(post_comment))
        .route("/api/comment/:id", delete(delete_comment))
        .with_state(Arc::new(state))
}

/// GET /api/video?videoId=
async fn get_video(
    State(state): State<Arc<YouTubeAppState>>,
    Query(query): Query<VideoQuery>,
) -> Result<Json<Value>, AppError> {
    let video_id = query
        .video_id
        .filter(|id| !id.is_empty())
        .or_else(|| state.video_id.clone())
        .ok_or_else(|| AppError::BadRequest("Missing videoId".to_string()))?;

    debug!(video_id = %video_id, "Fetching video details");
    let video = state.client.get_video(&video_id).await?;

    state
        .audit
        .record(AuditAction::FetchVideoDetails, json!({ "videoId": video_id }));
    Ok(Json(video))
}

/// PUT /api/video
///
/// Updates title and/or description of the configured video.
async fn update_video(
    State(state): State<Arc<YouTubeAppState>>,
    Json(request): Json<UpdateVideoRequest>,
) -> Result<Json<Value>, AppError> {
    let video_id = state.configured_video_id()?;

    let provided = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.is_empty());
    if !provided(&request.title) && !provided(&request.description) {
        return Err(AppError::BadRequest(
            "title or description required".to_string(),
        ));
    }

    let update = VideoUpdate {
        title: request.title,
        description: request.description,
    };
    let updated = state.client.update_video(video_id, &update).await?;

    info!(video_id = %video_id, "Video details updated");
    state.audit.record(
        AuditAction::UpdateVideoDetails,
        json!({
            "title": update.title,
            "description": update.description,
            "videoId": video_id,
        }),
    );
    Ok(Json(updated))
}

/// GET /api/comments?maxResults=&pageToken=&all=
async fn list_comments(
    State(state): State<Arc<YouTubeAppState>>,
    Query(query): Query<CommentsQuery>,
) -> Result<Json<Value>, AppError> {
    let video_id = state.configured_video_id()?;
    let page_size = query.page_size();
    let page_token = query.page_token.as_deref().filter(|t| !t.is_empty());

    if !query.wants_all() {
        let page = state
            .client
            .list_comment_threads(video_id, page_size, page_token)
            .await?;
        let count = page
            .get("items")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        state.audit.record(
            AuditAction::FetchCommentsPage,
            json!({ "pageToken": page_token, "count": count }),
        );
        return Ok(Json(page));
    }

    let pages = state
        .client
        .fetch_all_comment_threads(video_id, page_size, page_token)
        .await?;
    state.audit.record(
        AuditAction::FetchCommentsAll,
        json!({ "total": pages.items.len() }),
    );
    let body = serde_json::to_value(&pages)
        .map_err(|e| AppError::ServerError(format!("Failed to encode comments: {}", e)))?;
    Ok(Json(body))
}

/// POST /api/comment
///
/// Replies when `parentId` is given, otherwise starts a thread on the
/// configured video.
async fn post_comment(
    State(state): State<Arc<YouTubeAppState>>,
    Json(request): Json<PostCommentRequest>,
) -> Result<Json<Value>, AppError> {
    let text = request
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Comment text required".to_string()))?;

    let target = match request.parent_id.filter(|p| !p.is_empty()) {
        Some(parent_id) => CommentTarget::Reply { parent_id },
        None => CommentTarget::TopLevel {
            video_id: state.configured_video_id()?.to_string(),
        },
    };

    let posted = state.client.post_comment(&target, &text).await?;

    let parent_id = match &target {
        CommentTarget::Reply { parent_id } => Some(parent_id.as_str()),
        CommentTarget::TopLevel { .. } => None,
    };
    info!(is_reply = parent_id.is_some(), "Comment posted");
    state.audit.record(
        AuditAction::PostComment,
        json!({ "text": text, "parentId": parent_id }),
    );
    Ok(Json(posted))
}

/// DELETE /api/comment/:id
async fn delete_comment(
    State(state): State<Arc<YouTubeAppState>>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    if id.trim().is_empty() {
        return Err(AppError::BadRequest("Comment id required".to_string()));
    }

    let outcome = state
        .client
        .delete_comment(&id, state.delete_fallback)
        .await?;

    let action = match outcome {
        DeleteOutcome::Comment => AuditAction::DeleteComment,
        DeleteOutcome::CommentThread => AuditAction::DeleteCommentThread,
    };
    info!(id = %id, action = action.as_str(), "Comment deleted");
    state.audit.record(action, json!({ "id": id }));

    Ok(StatusCode::OK.into_response())
}
