//! Session Routes
//!
//! Endpoints:
//! - POST /api/v1/sessions - Upload a PDF (multipart field `file` or `pdf`)
//! - GET /api/v1/sessions/:id - Session summary
//! - DELETE /api/v1/sessions/:id - Discard session
//! - GET /api/v1/sessions/:id/thumbnails - Page previews for navigation

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use super::{run_blocking, with_session};
use crate::error::{AppError, Result};
use crate::pdf::{PageRasterizer, PdfDocument, RenderCache};
use crate::session::{SessionSummary, Thumbnail};
use crate::state::AppState;

/// Multipart field names accepted for the uploaded document
const UPLOAD_FIELDS: [&str; 2] = ["file", "pdf"];

/// Create the session router
pub fn router(state: &AppState) -> Router<AppState> {
    // Multipart framing overhead on top of the file itself
    let body_limit = state.config().max_upload_bytes() + 64 * 1024;

    Router::new()
        .route("/", post(create_session).layer(DefaultBodyLimit::max(body_limit)))
        .route("/:id", get(get_session).delete(delete_session))
        .route("/:id/thumbnails", get(thumbnails))
}

#[derive(Serialize)]
struct ThumbnailsResponse {
    pages: Vec<Thumbnail>,
}

/// POST /api/v1/sessions
///
/// Accepts a PDF upload and opens an edit session for it.
async fn create_session(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SessionSummary>)> {
    let max = state.config().max_upload_bytes();
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if !UPLOAD_FIELDS.contains(&name.as_str()) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("document.pdf").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;

        if data.len() > max {
            return Err(AppError::PayloadTooLarge { size: data.len(), max });
        }
        upload = Some((file_name, data.to_vec()));
        break;
    }

    let (file_name, data) =
        upload.ok_or_else(|| AppError::BadRequest("Missing 'file' field in upload".to_string()))?;
    let size = data.len();

    let cache_pages = state.config().render.cache_pages;
    let source = run_blocking(move || {
        let document = PdfDocument::from_bytes(data)?;
        let source: Arc<dyn PageRasterizer> = Arc::new(RenderCache::new(Arc::new(document), cache_pages));
        Ok(source)
    })
    .await?;

    tracing::info!(file_name = %file_name, size, pages = source.page_count(), "PDF uploaded");

    let session = state.sessions().create(&file_name, source).await?;
    let summary = session.lock().await.summary();

    Ok((StatusCode::CREATED, Json(summary)))
}

/// GET /api/v1/sessions/:id
async fn get_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<SessionSummary>> {
    let session = state.sessions().get(id).await?;
    let summary = session.lock().await.summary();
    Ok(Json(summary))
}

/// DELETE /api/v1/sessions/:id
async fn delete_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    state.sessions().remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/sessions/:id/thumbnails
async fn thumbnails(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<ThumbnailsResponse>> {
    let session = state.sessions().get(id).await?;
    let pages = with_session(session, |s| s.thumbnails()).await?;
    Ok(Json(ThumbnailsResponse { pages }))
}
