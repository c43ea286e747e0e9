//! Error types for the Retouch server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::export::ExportError;
use crate::imaging::ImagingError;
use crate::ocr::OcrError;
use crate::pdf::RenderError;
use crate::session::{EditorError, SessionError};

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("File too large: {size} bytes (max: {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Imaging(#[from] ImagingError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Session(e) => e.status_code(),
            Self::Editor(e) => e.status_code(),
            Self::Render(e) => e.status_code(),
            Self::Imaging(e) => e.status_code(),
            Self::Ocr(e) => e.status_code(),
            Self::Export(e) => e.status_code(),
        }
    }

    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::PayloadTooLarge { .. } => "FILE_TOO_LARGE",
            Self::Timeout(_) => "TIMEOUT",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Session(SessionError::NotFound(_)) => "SESSION_NOT_FOUND",
            Self::Session(SessionError::TooManySessions(_)) => "TOO_MANY_SESSIONS",
            Self::Editor(EditorError::RegionNotFound { .. }) => "REGION_NOT_FOUND",
            Self::Editor(EditorError::PageNotActive { .. }) => "PAGE_NOT_ACTIVE",
            Self::Editor(EditorError::NotAnalyzed(_)) => "PAGE_NOT_ANALYZED",
            Self::Editor(EditorError::InvalidFontSize(_)) => "INVALID_FONT_SIZE",
            Self::Editor(EditorError::InvalidStrokeWidth(_)) => "INVALID_STROKE_WIDTH",
            Self::Editor(EditorError::Imaging(e)) | Self::Imaging(e) => imaging_code(e),
            Self::Editor(EditorError::Render(e)) | Self::Render(e) => render_code(e),
            Self::Ocr(OcrError::ProviderNotAvailable(_)) => "OCR_UNAVAILABLE",
            Self::Ocr(_) => "OCR_FAILED",
            Self::Export(ExportError::NoPages) => "NOTHING_TO_EXPORT",
            Self::Export(_) => "EXPORT_FAILED",
        }
    }
}

fn imaging_code(err: &ImagingError) -> &'static str {
    match err {
        ImagingError::InvalidColor(_) => "INVALID_COLOR",
        ImagingError::Decode(_) => "INVALID_IMAGE",
        ImagingError::Encode(_) => "IMAGE_ENCODING_FAILED",
    }
}

fn render_code(err: &RenderError) -> &'static str {
    match err {
        RenderError::NotPdf => "NOT_A_PDF",
        RenderError::LoadError(_) => "INVALID_PDF",
        RenderError::PageNotFound { .. } => "PAGE_NOT_FOUND",
        RenderError::RenderError(_) | RenderError::ImageError(_) => "RENDER_FAILED",
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (message, details) = if status.is_server_error() {
            tracing::error!(code = self.code(), "Request failed: {}", self);
            let details = if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            };
            (status.canonical_reason().unwrap_or("Internal error").to_string(), details)
        } else {
            tracing::debug!(code = self.code(), "Request rejected: {}", self);
            (self.to_string(), None)
        };

        let body = Json(ErrorResponse {
            error: message,
            code: self.code(),
            details,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_status_codes() {
        let err = AppError::from(EditorError::Render(RenderError::PageNotFound { page: 4, count: 2 }));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "PAGE_NOT_FOUND");

        let err = AppError::from(EditorError::Imaging(ImagingError::InvalidColor("red".into())));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "INVALID_COLOR");

        let err = AppError::from(SessionError::NotFound("x".into()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_error_body() {
        let response = AppError::from(EditorError::NotAnalyzed(3)).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "PAGE_NOT_ANALYZED");
        assert_eq!(json["error"], "Page 3 has not been analyzed");
        assert!(json.get("details").is_none());
    }
}
