use std::path::{Component, Path as FsPath};

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::state::AppState;

/// Serve a previously uploaded file from the uploads directory.
pub async fn serve(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    let relative = FsPath::new(&path);
    if path.is_empty()
        || !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
    {
        return StatusCode::NOT_FOUND.into_response();
    }

    let full = state.config.uploads_path().join(relative);
    match tokio::fs::read(&full).await {
        Ok(data) => {
            let mime = mime_guess::from_path(&full).first_or_octet_stream();
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime.as_ref().to_string()),
                    (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
                ],
                data,
            )
                .into_response()
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!("Failed to read {}: {}", full.display(), e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
