//! OCR provider discovery
//!
//! Endpoints:
//! - GET /api/v1/ocr/providers - Configured providers and whether they respond

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::ocr::ProviderStatus;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ProvidersResponse {
    providers: Vec<ProviderStatus>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/providers", get(list_providers))
}

/// GET /api/v1/ocr/providers
async fn list_providers(State(state): State<AppState>) -> Json<ProvidersResponse> {
    let providers = state.ocr().await.provider_status().await;
    Json(ProvidersResponse { providers })
}
