//! Export Routes
//!
//! Endpoints:
//! - GET /api/v1/sessions/:id/export?format=pdf|pptx - Download the edited document

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{run_blocking, with_session};
use crate::error::Result;
use crate::export::{export_pages, ExportFormat};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/:id/export", get(export_document))
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

/// Name of the downloaded file: `<stem>_edited.<ext>`
fn download_name(file_name: &str, format: ExportFormat) -> String {
    let stem = std::path::Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document");

    // Keep the header value plain ASCII
    let stem: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();

    format!("{}_edited.{}", stem, format.extension())
}

/// GET /api/v1/sessions/:id/export
async fn export_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse> {
    let format = query.format;
    let dpi = state.config().render.dpi;

    let session = state.sessions().get(id).await?;
    let (title, pages) = with_session(session, |s| Ok((s.file_name().to_string(), s.export_images()?))).await?;

    let filename = download_name(&title, format);
    let bytes = run_blocking(move || Ok(export_pages(&pages, format, dpi, &title)?)).await?;

    tracing::info!(session_id = %id, format = format.extension(), size = bytes.len(), "Document exported");

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    ))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::routes::test_support::{app, send_json, upload};

    #[test]
    fn test_download_name() {
        assert_eq!(download_name("slides.pdf", ExportFormat::Pdf), "slides_edited.pdf");
        assert_eq!(download_name("Q3 deck.PDF", ExportFormat::Pptx), "Q3_deck_edited.pptx");
        assert_eq!(download_name("報告.pdf", ExportFormat::Pdf), "___edited.pdf");
        assert_eq!(download_name("", ExportFormat::Pdf), "document_edited.pdf");
    }

    async fn download(app: &axum::Router, uri: &str) -> (StatusCode, String, String, Vec<u8>) {
        let request = Request::builder().method(Method::GET).uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let header_value = |name: header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        let content_type = header_value(header::CONTENT_TYPE);
        let disposition = header_value(header::CONTENT_DISPOSITION);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, disposition, body.to_vec())
    }

    #[tokio::test]
    async fn test_export_pdf() {
        let app = app();
        let id = upload(&app, 3).await;

        let (status, content_type, disposition, body) =
            download(&app, &format!("/api/v1/sessions/{}/export", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type, "application/pdf");
        assert_eq!(disposition, "attachment; filename=\"slides_edited.pdf\"");

        let document = lopdf::Document::load_mem(&body).unwrap();
        assert_eq!(document.get_pages().len(), 3);
    }

    #[tokio::test]
    async fn test_export_pptx() {
        let app = app();
        let id = upload(&app, 2).await;

        let (status, content_type, disposition, body) =
            download(&app, &format!("/api/v1/sessions/{}/export?format=pptx", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.contains("presentationml"));
        assert!(disposition.ends_with("slides_edited.pptx\""));

        let mut archive = zip::ZipArchive::new(Cursor::new(body)).unwrap();
        assert!(archive.by_name("ppt/slides/slide2.xml").is_ok());
        assert!(archive.by_name("ppt/slides/slide3.xml").is_err());
    }

    #[tokio::test]
    async fn test_export_unknown_format() {
        let app = app();
        let id = upload(&app, 1).await;

        let (status, _) = send_json(&app, Method::GET, &format!("/api/v1/sessions/{}/export?format=docx", id), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
