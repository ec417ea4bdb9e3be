// Integration tests for the /api/notes and /api/note endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use yt_companion::api::{create_notes_router, NotesAppState};
use yt_companion::audit::AuditLog;
use yt_companion::notes::NoteStore;

struct TestApp {
    router: Router,
    audit: Arc<AuditLog>,
}

fn create_test_app(video_id: Option<&str>) -> TestApp {
    let audit = Arc::new(AuditLog::new(":memory:").unwrap());
    let state = NotesAppState {
        store: Arc::new(NoteStore::new(":memory:").unwrap()),
        audit: Arc::clone(&audit),
        video_id: video_id.map(|v| v.to_string()),
    };
    TestApp {
        router: create_notes_router(state),
        audit,
    }
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn create_note(app: &Router, body: Value) -> Value {
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/note", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

/// POST /api/note stores the note under the default video and returns 201.
#[tokio::test]
async fn test_create_note_uses_default_video() {
    let app = create_test_app(Some("vid1"));

    let note = create_note(&app.router, json!({ "content": "  intro is too long  ", "tags": ["edit"] })).await;

    assert_eq!(note["content"], "intro is too long");
    assert_eq!(note["videoId"], "vid1");
    assert_eq!(note["tags"], json!(["edit"]));
    assert!(note["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert_eq!(note["createdAt"], note["updatedAt"]);

    let entries = app.audit.recent(10).unwrap();
    assert_eq!(entries[0].action, "ADD_NOTE");
    assert_eq!(entries[0].meta["noteId"], note["id"]);
}

/// Comma-separated tags are split and trimmed.
#[tokio::test]
async fn test_create_note_with_csv_tags() {
    let app = create_test_app(Some("vid1"));

    let note = create_note(&app.router, json!({ "content": "thumbnail", "tags": "design, todo ,," })).await;
    assert_eq!(note["tags"], json!(["design", "todo"]));
}

/// Blank content is rejected.
#[tokio::test]
async fn test_create_note_requires_content() {
    let app = create_test_app(Some("vid1"));

    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/api/note", json!({ "content": "   " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "content required");
}

/// GET /api/notes lists only the requested video's notes.
#[tokio::test]
async fn test_list_notes_by_video() {
    let app = create_test_app(Some("vid1"));
    create_note(&app.router, json!({ "content": "first" })).await;
    create_note(&app.router, json!({ "content": "second" })).await;
    create_note(&app.router, json!({ "content": "elsewhere", "videoId": "vid2" })).await;

    let response = app
        .router
        .clone()
        .oneshot(empty_request("GET", "/api/notes"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let notes = body_json(response).await;
    let contents: Vec<&str> = notes
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["second", "first"]);

    let response = app
        .router
        .clone()
        .oneshot(empty_request("GET", "/api/notes?videoId=vid2"))
        .await
        .unwrap();
    let notes = body_json(response).await;
    assert_eq!(notes.as_array().unwrap().len(), 1);
    assert_eq!(notes[0]["content"], "elsewhere");
}

/// Without a configured or requested video the list is a bad request.
#[tokio::test]
async fn test_list_notes_without_video() {
    let app = create_test_app(None);

    let response = app
        .router
        .oneshot(empty_request("GET", "/api/notes"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// PUT /api/note/:id changes only the provided fields.
#[tokio::test]
async fn test_update_note_partial() {
    let app = create_test_app(Some("vid1"));
    let note = create_note(&app.router, json!({ "content": "draft", "tags": ["a"] })).await;
    let id = note["id"].as_str().unwrap();

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/note/{}", id),
            json!({ "tags": "b, c" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let updated = body_json(response).await;
    assert_eq!(updated["content"], "draft");
    assert_eq!(updated["tags"], json!(["b", "c"]));
    assert_eq!(updated["createdAt"], note["createdAt"]);

    let entries = app.audit.recent(1).unwrap();
    assert_eq!(entries[0].action, "UPDATE_NOTE");
    assert_eq!(entries[0].meta["changes"], json!(["tags", "updatedAt"]));
}

/// Updating or deleting an unknown note is a 404.
#[tokio::test]
async fn test_unknown_note_not_found() {
    let app = create_test_app(Some("vid1"));

    let response = app
        .router
        .clone()
        .oneshot(json_request("PUT", "/api/note/missing", json!({ "content": "x" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Note not found");

    let response = app
        .router
        .clone()
        .oneshot(empty_request("DELETE", "/api/note/missing"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// DELETE /api/note/:id returns 204 and the note is gone.
#[tokio::test]
async fn test_delete_note() {
    let app = create_test_app(Some("vid1"));
    let note = create_note(&app.router, json!({ "content": "remove me" })).await;
    let id = note["id"].as_str().unwrap();

    let response = app
        .router
        .clone()
        .oneshot(empty_request("DELETE", &format!("/api/note/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .router
        .clone()
        .oneshot(empty_request("GET", "/api/notes"))
        .await
        .unwrap();
    assert_eq!(body_json(response).await, json!([]));

    assert_eq!(app.audit.recent(1).unwrap()[0].action, "DELETE_NOTE");
}

/// Search is a case-insensitive substring match; regex metacharacters are literal.
#[tokio::test]
async fn test_search_notes() {
    let app = create_test_app(Some("vid1"));
    create_note(&app.router, json!({ "content": "Fix the INTRO music" })).await;
    create_note(&app.router, json!({ "content": "pin comment (a+b)" })).await;

    let response = app
        .router
        .clone()
        .oneshot(empty_request("GET", "/api/note/search?q=intro"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let hits = body_json(response).await;
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert_eq!(hits[0]["content"], "Fix the INTRO music");

    let response = app
        .router
        .clone()
        .oneshot(empty_request("GET", "/api/note/search?q=%28a%2Bb%29"))
        .await
        .unwrap();
    let hits = body_json(response).await;
    assert_eq!(hits.as_array().unwrap().len(), 1);

    let response = app
        .router
        .clone()
        .oneshot(empty_request("GET", "/api/note/search"))
        .await
        .unwrap();
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);
}
