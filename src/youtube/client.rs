use super::{
    error_has_reason, CommentTarget, CommentThreadPages, DeleteFallback, DeleteOutcome,
    UpstreamError, VideoUpdate, DEFAULT_CATEGORY_ID, INVALID_CATEGORY_HINT,
};
use crate::token::TokenProvider;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// How a request is authorized.
enum Credential {
    Bearer(String),
    ApiKey(String),
}

/// Whether a call may fall back to the API key when no token is available.
#[derive(Clone, Copy, PartialEq, Eq)]
enum AuthMode {
    /// Writes: a bearer token is mandatory.
    Required,
    /// Public reads: use the API key if the token cannot be obtained.
    ReadFallback,
}

/// HTTP client for the YouTube Data API v3.
pub struct YouTubeClient {
    http_client: Client,
    base_url: String,
    tokens: Arc<TokenProvider>,
    api_key: Option<String>,
    comments_safety_limit: usize,
}

impl YouTubeClient {
    pub fn new(base_url: String, tokens: Arc<TokenProvider>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
            api_key: None,
            comments_safety_limit: 1000,
        }
    }

    /// API key used for reads when no access token can be obtained.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_comments_safety_limit(mut self, limit: usize) -> Self {
        self.comments_safety_limit = limit;
        self
    }

    /// `videos.list` with snippet and statistics.
    pub async fn get_video(&self, video_id: &str) -> Result<Value, UpstreamError> {
        let url = format!("{}/videos", self.base_url);
        let response = self
            .execute(AuthMode::ReadFallback, || {
                self.http_client
                    .get(&url)
                    .query(&[("part", "snippet,statistics"), ("id", video_id)])
            })
            .await?;
        json_body(response, "videos.list").await
    }

    /// One page of `commentThreads.list` with replies.
    pub async fn list_comment_threads(
        &self,
        video_id: &str,
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<Value, UpstreamError> {
        let url = format!("{}/commentThreads", self.base_url);
        let max_results = max_results.to_string();
        let response = self
            .execute(AuthMode::ReadFallback, || {
                let request = self.http_client.get(&url).query(&[
                    ("part", "snippet,replies"),
                    ("videoId", video_id),
                    ("maxResults", max_results.as_str()),
                ]);
                match page_token {
                    Some(token) => request.query(&[("pageToken", token)]),
                    None => request,
                }
            })
            .await?;
        json_body(response, "commentThreads.list").await
    }

    /// Follows `nextPageToken` until the last page or the safety limit.
    ///
    /// The safety limit bounds both collected items and pages fetched, and a
    /// page that hands back the token it was requested with ends the walk.
    pub async fn fetch_all_comment_threads(
        &self,
        video_id: &str,
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<CommentThreadPages, UpstreamError> {
        let mut items = Vec::new();
        let mut next_token = page_token.map(str::to_string);
        let mut pages = 0usize;

        loop {
            let requested = next_token.take();
            let page = self
                .list_comment_threads(video_id, max_results, requested.as_deref())
                .await?;
            pages += 1;
            if let Some(page_items) = page.get("items").and_then(Value::as_array) {
                items.extend(page_items.iter().cloned());
            }
            next_token = page
                .get("nextPageToken")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string);

            if next_token.is_none() {
                break;
            }
            if next_token == requested {
                warn!(
                    video_id = %video_id,
                    page_token = ?next_token,
                    "Comment pagination returned the requested page token again, stopping"
                );
                break;
            }
            if items.len() >= self.comments_safety_limit || pages >= self.comments_safety_limit {
                warn!(
                    video_id = %video_id,
                    collected = items.len(),
                    pages = pages,
                    limit = self.comments_safety_limit,
                    "Comment pagination stopped at safety limit"
                );
                break;
            }
        }

        debug!(video_id = %video_id, total = items.len(), "Fetched comment threads");

        Ok(CommentThreadPages {
            items,
            fetched_all: next_token.is_none(),
            next_page_token: next_token,
        })
    }

    /// Posts a top-level comment thread or a reply.
    pub async fn post_comment(
        &self,
        target: &CommentTarget,
        text: &str,
    ) -> Result<Value, UpstreamError> {
        let (url, body, operation) = match target {
            CommentTarget::Reply { parent_id } => (
                format!("{}/comments", self.base_url),
                json!({ "snippet": { "parentId": parent_id, "textOriginal": text } }),
                "comments.insert",
            ),
            CommentTarget::TopLevel { video_id } => (
                format!("{}/commentThreads", self.base_url),
                json!({
                    "snippet": {
                        "videoId": video_id,
                        "topLevelComment": { "snippet": { "textOriginal": text } }
                    }
                }),
                "commentThreads.insert",
            ),
        };

        let response = self
            .execute(AuthMode::Required, || {
                self.http_client
                    .post(&url)
                    .query(&[("part", "snippet")])
                    .json(&body)
            })
            .await?;
        json_body(response, operation).await
    }

    /// Deletes a comment, applying `fallback` when the API answers 400.
    pub async fn delete_comment(
        &self,
        id: &str,
        fallback: DeleteFallback,
    ) -> Result<DeleteOutcome, UpstreamError> {
        match self.delete_resource("comments", id).await {
            Ok(()) => Ok(DeleteOutcome::Comment),
            Err(UpstreamError::Status { status, .. })
                if status == StatusCode::BAD_REQUEST
                    && fallback == DeleteFallback::ThreadOnBadRequest =>
            {
                debug!(id = %id, "comments.delete rejected with 400, deleting comment thread");
                self.delete_resource("commentThreads", id).await?;
                Ok(DeleteOutcome::CommentThread)
            }
            Err(e) => Err(e),
        }
    }

    async fn delete_resource(&self, resource: &str, id: &str) -> Result<(), UpstreamError> {
        let url = format!("{}/{}", self.base_url, resource);
        let response = self
            .execute(AuthMode::Required, || {
                self.http_client.delete(&url).query(&[("id", id)])
            })
            .await?;
        check_status(response, resource).await.map(|_| ())
    }

    /// Replaces title and/or description, keeping the rest of the snippet.
    ///
    /// The snippet is read first because `videos.update` overwrites it whole.
    pub async fn update_video(
        &self,
        video_id: &str,
        update: &VideoUpdate,
    ) -> Result<Value, UpstreamError> {
        let url = format!("{}/videos", self.base_url);

        let response = self
            .execute(AuthMode::Required, || {
                self.http_client
                    .get(&url)
                    .query(&[("part", "snippet"), ("id", video_id)])
            })
            .await?;
        let current = json_body(response, "videos.list").await?;

        let mut snippet = current
            .pointer("/items/0/snippet")
            .filter(|s| s.is_object())
            .cloned()
            .ok_or_else(|| UpstreamError::NotFound("Video not found or snippet missing".to_string()))?;

        if let Some(title) = &update.title {
            snippet["title"] = Value::String(title.clone());
        }
        if let Some(description) = &update.description {
            snippet["description"] = Value::String(description.clone());
        }
        let has_category = snippet
            .get("categoryId")
            .and_then(Value::as_str)
            .is_some_and(|c| !c.is_empty());
        if !has_category {
            snippet["categoryId"] = Value::String(DEFAULT_CATEGORY_ID.to_string());
        }

        let body = json!({ "id": video_id, "snippet": snippet });
        let response = self
            .execute(AuthMode::Required, || {
                self.http_client
                    .put(&url)
                    .query(&[("part", "snippet")])
                    .json(&body)
            })
            .await?;

        json_body(response, "videos.update").await.map_err(|e| match e {
            UpstreamError::Status { status, mut body } => {
                if error_has_reason(&body, "invalidCategoryId") {
                    if let Some(obj) = body.as_object_mut() {
                        obj.insert("hint".to_string(), Value::String(INVALID_CATEGORY_HINT.to_string()));
                    }
                }
                UpstreamError::Status { status, body }
            }
            other => other,
        })
    }

    /// Sends an authorized request, retrying once with a fresh token on 401.
    ///
    /// `build` is called once per attempt.
    async fn execute<F>(&self, mode: AuthMode, build: F) -> Result<Response, UpstreamError>
    where
        F: Fn() -> RequestBuilder,
    {
        let credential = match mode {
            AuthMode::Required => Credential::Bearer(self.tokens.get_access_token().await?),
            AuthMode::ReadFallback => self.read_credential().await?,
        };

        let response = send(build(), &credential).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        let Credential::Bearer(_) = credential else {
            return Ok(response);
        };

        warn!("YouTube API rejected access token, forcing refresh and retrying once");
        let fresh = self.tokens.force_refresh().await?;
        send(build(), &Credential::Bearer(fresh)).await
    }

    async fn read_credential(&self) -> Result<Credential, UpstreamError> {
        match self.tokens.get_access_token().await {
            Ok(token) => Ok(Credential::Bearer(token)),
            Err(e) => match &self.api_key {
                Some(key) => {
                    warn!(error = %e, "No access token for read, falling back to API key");
                    Ok(Credential::ApiKey(key.clone()))
                }
                None => Err(e.into()),
            },
        }
    }
}

async fn send(request: RequestBuilder, credential: &Credential) -> Result<Response, UpstreamError> {
    let request = match credential {
        Credential::Bearer(token) => request.bearer_auth(token),
        Credential::ApiKey(key) => request.query(&[("key", key.as_str())]),
    };
    request
        .send()
        .await
        .map_err(|e| UpstreamError::Transport(e.to_string()))
}

/// Turns a non-success response into [`UpstreamError::Status`].
async fn check_status(response: Response, operation: &str) -> Result<Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<Value>(&text).unwrap_or_else(|_| json!({ "message": text }));
    error!(operation = operation, status = %status, body = %body, "YouTube API error");
    Err(UpstreamError::Status { status, body })
}

async fn json_body(response: Response, operation: &str) -> Result<Value, UpstreamError> {
    let response = check_status(response, operation).await?;
    response
        .json::<Value>()
        .await
        .map_err(|e| UpstreamError::Transport(format!("Failed to parse {} response: {}", operation, e)))
}
