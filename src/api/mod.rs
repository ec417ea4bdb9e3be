// HTTP API: YouTube proxy routes and note CRUD under /api

mod error;
pub mod notes;
pub mod youtube;

pub use error::AppError;
pub use notes::{create_notes_router, NotesAppState};
pub use youtube::{create_youtube_router, YouTubeAppState};

use axum::http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    HeaderName, HeaderValue, Method,
};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

/// Full `/api` router with CORS applied.
pub fn create_router(
    youtube: YouTubeAppState,
    notes: NotesAppState,
    allowed_origins: &[String],
) -> Router {
    Router::new()
        .merge(create_youtube_router(youtube))
        .merge(create_notes_router(notes))
        .layer(cors_layer(allowed_origins))
}

/// CORS policy: listed origins only, with credentials.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(true)
}
