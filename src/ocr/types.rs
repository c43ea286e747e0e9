//! OCR Types
//!
//! Defines types for text detection on rendered page bitmaps.

use serde::{Deserialize, Serialize};

/// OCR provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrProvider {
    /// RapidOCR HTTP API (PP-OCR models on ONNX Runtime)
    RapidOcr,
    /// Tesseract OCR (local CLI)
    Tesseract,
}

impl OcrProvider {
    /// Parse a provider name as used in configuration
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "rapidocr" | "rapid" => Some(Self::RapidOcr),
            "tesseract" => Some(Self::Tesseract),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::RapidOcr => "rapidocr",
            Self::Tesseract => "tesseract",
        }
    }
}

/// A point in page pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One detected text instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextDetection {
    /// Corner points of the detected text polygon (usually 4)
    pub polygon: Vec<Point>,
    /// Recognized text
    pub text: String,
    /// Recognition confidence (0-1)
    pub confidence: f64,
}

impl TextDetection {
    /// Detection with an axis-aligned rectangle as its polygon
    pub fn from_rect(left: f64, top: f64, width: f64, height: f64, text: impl Into<String>, confidence: f64) -> Self {
        Self {
            polygon: vec![
                Point::new(left, top),
                Point::new(left + width, top),
                Point::new(left + width, top + height),
                Point::new(left, top + height),
            ],
            text: text.into(),
            confidence,
        }
    }
}

/// OCR error types
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR provider not available: {0}")]
    ProviderNotAvailable(String),

    #[error("Failed to prepare page image: {0}")]
    ImageEncodingError(String),

    #[error("OCR processing failed: {0}")]
    ProcessingError(String),

    #[error("API error: {0}")]
    ApiError(String),
}

impl OcrError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::ProviderNotAvailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::ApiError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
