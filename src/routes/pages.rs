//! Page Routes
//!
//! Endpoints under /api/v1/sessions/:id/pages/:page:
//! - POST navigate - Make the page active
//! - GET image - Current page bitmap as PNG
//! - POST analyze - Run OCR and replace the page's regions
//! - GET regions - Region list
//! - GET/PUT canvas - Overlay drawing / geometry reported back by the canvas
//! - PUT selection - Select a region
//! - GET panel - Edit form state
//! - POST recompute - Re-derive font sizes from box heights
//! - POST regions/:index/commit - Erase a region and draw replacement text
//! - POST undo, POST redo - Page history

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{run_to_completion, with_session};
use crate::error::Result;
use crate::ocr::OcrProvider;
use crate::session::{CanvasDrawing, CanvasRect, CommitRequest, EditPanel, Region, Selection};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/pages/:page/navigate", post(navigate))
        .route("/:id/pages/:page/image", get(page_image))
        .route("/:id/pages/:page/analyze", post(analyze))
        .route("/:id/pages/:page/regions", get(list_regions))
        .route("/:id/pages/:page/canvas", get(get_canvas).put(sync_canvas))
        .route("/:id/pages/:page/selection", put(select_region))
        .route("/:id/pages/:page/panel", get(edit_panel))
        .route("/:id/pages/:page/recompute", post(recompute))
        .route("/:id/pages/:page/regions/:index/commit", post(commit))
        .route("/:id/pages/:page/undo", post(undo))
        .route("/:id/pages/:page/redo", post(redo))
}

// ============================================================================
// Request / response bodies
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeQuery {
    /// Force a single OCR provider instead of the fallback chain
    pub provider: Option<OcrProvider>,
}

#[derive(Serialize)]
pub struct RegionsResponse {
    pub page: usize,
    pub regions: Vec<Region>,
}

#[derive(Deserialize)]
pub struct CanvasUpdate {
    pub objects: Vec<CanvasRect>,
}

#[derive(Deserialize)]
pub struct SelectRequest {
    pub index: usize,
}

#[derive(Serialize)]
pub struct SelectionResponse {
    pub changed: bool,
    pub selection: Selection,
}

#[derive(Serialize)]
pub struct CommitResponse {
    pub region: Region,
    pub selection: Selection,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub applied: bool,
    pub canvas_key: u64,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/sessions/:id/pages/:page/navigate
async fn navigate(State(state): State<AppState>, Path((id, page)): Path<(Uuid, usize)>) -> Result<Json<Selection>> {
    let session = state.sessions().get(id).await?;
    let selection = with_session(session, move |s| s.navigate(page).cloned()).await?;
    Ok(Json(selection))
}

/// GET /api/v1/sessions/:id/pages/:page/image
async fn page_image(State(state): State<AppState>, Path((id, page)): Path<(Uuid, usize)>) -> Result<impl IntoResponse> {
    let session = state.sessions().get(id).await?;
    let png = with_session(session, move |s| s.page_png(page)).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        png,
    ))
}

/// POST /api/v1/sessions/:id/pages/:page/analyze
///
/// The session stays locked until the detected regions are stored, so
/// requests arriving during OCR apply after it.
async fn analyze(
    State(state): State<AppState>,
    Path((id, page)): Path<(Uuid, usize)>,
    Query(query): Query<AnalyzeQuery>,
) -> Result<Json<RegionsResponse>> {
    let session = state.sessions().get(id).await?;
    let guard = session.lock_owned().await;

    let (mut guard, png) = run_to_completion(move || {
        let png = guard.page_png(page)?;
        Ok((guard, png))
    })
    .await?;

    let start = std::time::Instant::now();
    let detections = state.ocr().await.detect(&png, query.provider).await?;
    tracing::info!(
        session_id = %id,
        page,
        detections = detections.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Page analyzed"
    );

    let regions = guard.apply_detections(page, &detections)?.to_vec();
    Ok(Json(RegionsResponse { page, regions }))
}

/// GET /api/v1/sessions/:id/pages/:page/regions
async fn list_regions(
    State(state): State<AppState>,
    Path((id, page)): Path<(Uuid, usize)>,
) -> Result<Json<RegionsResponse>> {
    let session = state.sessions().get(id).await?;
    let regions = session.lock().await.regions(page).map(<[Region]>::to_vec)?;
    Ok(Json(RegionsResponse { page, regions }))
}

/// GET /api/v1/sessions/:id/pages/:page/canvas
async fn get_canvas(State(state): State<AppState>, Path((id, page)): Path<(Uuid, usize)>) -> Result<Json<CanvasDrawing>> {
    let session = state.sessions().get(id).await?;
    let drawing = with_session(session, move |s| s.canvas(page)).await?;
    Ok(Json(drawing))
}

/// PUT /api/v1/sessions/:id/pages/:page/canvas
async fn sync_canvas(
    State(state): State<AppState>,
    Path((id, page)): Path<(Uuid, usize)>,
    Json(update): Json<CanvasUpdate>,
) -> Result<Json<SelectionResponse>> {
    let session = state.sessions().get(id).await?;
    let response = with_session(session, move |s| {
        let changed = s.sync_canvas(page, &update.objects)?;
        Ok(SelectionResponse {
            changed,
            selection: s.selection().clone(),
        })
    })
    .await?;
    Ok(Json(response))
}

/// PUT /api/v1/sessions/:id/pages/:page/selection
async fn select_region(
    State(state): State<AppState>,
    Path((id, page)): Path<(Uuid, usize)>,
    Json(request): Json<SelectRequest>,
) -> Result<Json<SelectionResponse>> {
    let session = state.sessions().get(id).await?;
    let mut guard = session.lock().await;
    let changed = guard.select_region(page, request.index)?;

    Ok(Json(SelectionResponse {
        changed,
        selection: guard.selection().clone(),
    }))
}

/// GET /api/v1/sessions/:id/pages/:page/panel
async fn edit_panel(State(state): State<AppState>, Path((id, page)): Path<(Uuid, usize)>) -> Result<Json<EditPanel>> {
    let session = state.sessions().get(id).await?;
    let panel = with_session(session, move |s| s.edit_panel(page)).await?;
    Ok(Json(panel))
}

/// POST /api/v1/sessions/:id/pages/:page/recompute
async fn recompute(
    State(state): State<AppState>,
    Path((id, page)): Path<(Uuid, usize)>,
) -> Result<Json<RegionsResponse>> {
    let session = state.sessions().get(id).await?;
    let regions = session.lock().await.recompute_fonts(page).map(<[Region]>::to_vec)?;
    Ok(Json(RegionsResponse { page, regions }))
}

/// POST /api/v1/sessions/:id/pages/:page/regions/:index/commit
async fn commit(
    State(state): State<AppState>,
    Path((id, page, index)): Path<(Uuid, usize, usize)>,
    Json(request): Json<CommitRequest>,
) -> Result<Json<CommitResponse>> {
    let session = state.sessions().get(id).await?;
    let fonts = state.fonts();
    let mut guard = session.lock_owned().await;

    let response = run_to_completion(move || {
        let region = guard.commit(page, index, &request, &fonts)?.clone();
        Ok(CommitResponse {
            region,
            selection: guard.selection().clone(),
        })
    })
    .await?;

    Ok(Json(response))
}

/// POST /api/v1/sessions/:id/pages/:page/undo
async fn undo(State(state): State<AppState>, Path((id, page)): Path<(Uuid, usize)>) -> Result<Json<HistoryResponse>> {
    let session = state.sessions().get(id).await?;
    let response = with_session(session, move |s| {
        let applied = s.undo(page)?;
        Ok(HistoryResponse {
            applied,
            canvas_key: s.selection().canvas_key,
        })
    })
    .await?;
    Ok(Json(response))
}

/// POST /api/v1/sessions/:id/pages/:page/redo
async fn redo(State(state): State<AppState>, Path((id, page)): Path<(Uuid, usize)>) -> Result<Json<HistoryResponse>> {
    let session = state.sessions().get(id).await?;
    let response = with_session(session, move |s| {
        let applied = s.redo(page)?;
        Ok(HistoryResponse {
            applied,
            canvas_key: s.selection().canvas_key,
        })
    })
    .await?;
    Ok(Json(response))
}
