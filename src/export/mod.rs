//! Document export
//!
//! Turns the final page bitmaps of a session into a downloadable file:
//! a PDF with one full-page image per page, or a 16:9 slide deck with one
//! picture per slide.

mod pdf;
mod pptx;

pub use pdf::images_to_pdf;
pub use pptx::{images_to_pptx, SLIDE_HEIGHT_EMU, SLIDE_WIDTH_EMU};

use serde::Deserialize;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Pdf,
    Pptx,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Pptx => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Pptx => "pptx",
        }
    }
}

/// Export errors
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Nothing to export")]
    NoPages,

    #[error("Invalid page image: {0}")]
    Image(String),

    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::NoPages => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Encode page PNGs in the requested format
pub fn export_pages(pages: &[Vec<u8>], format: ExportFormat, dpi: f32, title: &str) -> Result<Vec<u8>, ExportError> {
    let start = std::time::Instant::now();
    let bytes = match format {
        ExportFormat::Pdf => images_to_pdf(pages, dpi, title)?,
        ExportFormat::Pptx => images_to_pptx(pages, title)?,
    };

    tracing::info!(
        format = format.extension(),
        pages = pages.len(),
        bytes = bytes.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Export finished"
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_query_value() {
        let pptx: ExportFormat = serde_json::from_str("\"pptx\"").unwrap();
        assert_eq!(pptx, ExportFormat::Pptx);
        assert_eq!(pptx.extension(), "pptx");
        assert!(serde_json::from_str::<ExportFormat>("\"docx\"").is_err());
        assert_eq!(ExportFormat::default().content_type(), "application/pdf");
    }

    #[test]
    fn test_empty_export_is_rejected() {
        assert!(matches!(export_pages(&[], ExportFormat::Pdf, 150.0, "x"), Err(ExportError::NoPages)));
        assert!(matches!(export_pages(&[], ExportFormat::Pptx, 150.0, "x"), Err(ExportError::NoPages)));
    }
}
