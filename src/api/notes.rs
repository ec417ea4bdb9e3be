//! Note CRUD endpoints.

use super::AppError;
use crate::audit::{AuditAction, AuditLog};
use crate::notes::{Note, NoteStore, NoteUpdate, TagsInput};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Shared application state for the notes API
#[derive(Clone)]
pub struct NotesAppState {
    pub store: Arc<NoteStore>,
    pub audit: Arc<AuditLog>,
    /// Default video for requests that name none
    pub video_id: Option<String>,
}

/// Query for GET /api/notes
#[derive(Deserialize)]
pub struct NotesQuery {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

/// Query for GET /api/note/search
#[derive(Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
}

/// Body for POST /api/note
#[derive(Deserialize)]
pub struct CreateNoteRequest {
    content: Option<String>,
    tags: Option<TagsInput>,
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

/// Body for PUT /api/note/:id
#[derive(Deserialize)]
pub struct UpdateNoteRequest {
    content: Option<String>,
    tags: Option<TagsInput>,
}

/// Create notes router
pub fn create_notes_router(state: NotesAppState) -> Router {
    Router::new()
        .route("/api/notes", get(list_notes))
        .route("/api/note", post(create_note))
        .route("/api/note/search", get(search_notes))
        .route("/api/note/:id", put(update_note).delete(delete_note))
        .with_state(Arc::new(state))
}

fn store_error(operation: &str, e: anyhow::Error) -> AppError {
    error!(operation = operation, error = %e, "Note store failure");
    AppError::from(e)
}

/// GET /api/notes?videoId=
async fn list_notes(
    State(state): State<Arc<NotesAppState>>,
    Query(query): Query<NotesQuery>,
) -> Result<Json<Vec<Note>>, AppError> {
    let video_id = query
        .video_id
        .filter(|id| !id.is_empty())
        .or_else(|| state.video_id.clone())
        .ok_or_else(|| AppError::BadRequest("Missing videoId".to_string()))?;

    let notes = state
        .store
        .list_by_video(&video_id)
        .map_err(|e| store_error("list", e))?;

    debug!(video_id = %video_id, count = notes.len(), "Listed notes");
    Ok(Json(notes))
}

/// POST /api/note
async fn create_note(
    State(state): State<Arc<NotesAppState>>,
    Json(request): Json<CreateNoteRequest>,
) -> Result<Response, AppError> {
    let content = request
        .content
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("content required".to_string()))?;

    let video_id = request
        .video_id
        .filter(|id| !id.is_empty())
        .or_else(|| state.video_id.clone());
    let tags = request.tags.map(TagsInput::into_tags).unwrap_or_default();

    let note = state
        .store
        .create(video_id.as_deref(), content, tags)
        .map_err(|e| store_error("create", e))?;

    info!(note_id = %note.id, video_id = ?note.video_id, "Note created");
    state.audit.record(
        AuditAction::AddNote,
        json!({ "noteId": note.id, "videoId": note.video_id }),
    );

    Ok((StatusCode::CREATED, Json(note)).into_response())
}

/// PUT /api/note/:id
///
/// Partial update: only fields present in the body change.
async fn update_note(
    State(state): State<Arc<NotesAppState>>,
    Path(id): Path<String>,
    Json(request): Json<UpdateNoteRequest>,
) -> Result<Json<Note>, AppError> {
    let content = match request.content {
        Some(content) => {
            let trimmed = content.trim();
            if trimmed.is_empty() {
                return Err(AppError::BadRequest("content required".to_string()));
            }
            Some(trimmed.to_string())
        }
        None => None,
    };

    let update = NoteUpdate {
        content,
        tags: request.tags.map(TagsInput::into_tags),
    };
    let changes = update.changed_fields();

    let note = state
        .store
        .update(&id, update)
        .map_err(|e| store_error("update", e))?
        .ok_or_else(|| AppError::NotFound("Note not found".to_string()))?;

    info!(note_id = %id, changes = ?changes, "Note updated");
    state.audit.record(
        AuditAction::UpdateNote,
        json!({ "noteId": id, "changes": changes }),
    );
    Ok(Json(note))
}

/// DELETE /api/note/:id
async fn delete_note(
    State(state): State<Arc<NotesAppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let note = state
        .store
        .delete(&id)
        .map_err(|e| store_error("delete", e))?
        .ok_or_else(|| AppError::NotFound("Note not found".to_string()))?;

    info!(note_id = %id, "Note deleted");
    state.audit.record(
        AuditAction::DeleteNote,
        json!({ "noteId": id, "videoId": note.video_id }),
    );
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/note/search?q=
async fn search_notes(
    State(state): State<Arc<NotesAppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Note>>, AppError> {
    let q = query.q.unwrap_or_default();
    let notes = state
        .store
        .search(q.trim())
        .map_err(|e| store_error("search", e))?;
    debug!(query = %q, hits = notes.len(), "Searched notes");
    Ok(Json(notes))
}
