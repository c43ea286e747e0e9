//! PDF page rasterization
//!
//! Uploaded PDFs are only ever turned into page bitmaps; no text layer or
//! structure is read. Rendering goes through the [`PageRasterizer`] trait so
//! the editor can be driven by the MuPDF-backed [`PdfDocument`], the LRU
//! [`RenderCache`] wrapped around it, or any other page source.

mod cache;
mod document;
mod traits;

#[cfg(test)]
pub(crate) mod fake;

pub use cache::RenderCache;
pub use document::PdfDocument;
pub use traits::PageRasterizer;

use thiserror::Error;

/// Page rendering errors
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Not a PDF document")]
    NotPdf,

    #[error("Failed to load PDF: {0}")]
    LoadError(String),

    #[error("Page {page} not found (document has {count} pages)")]
    PageNotFound { page: usize, count: usize },

    #[error("Failed to render page: {0}")]
    RenderError(String),

    #[error("Image conversion error: {0}")]
    ImageError(String),
}

impl RenderError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::NotPdf | Self::LoadError(_) => StatusCode::BAD_REQUEST,
            Self::PageNotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<mupdf::Error> for RenderError {
    fn from(err: mupdf::Error) -> Self {
        RenderError::RenderError(err.to_string())
    }
}
