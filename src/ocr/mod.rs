//! OCR Module
//!
//! Detects text lines on rendered page bitmaps.
//!
//! Supports multiple backends:
//! - RapidOCR (HTTP API around PP-OCR models)
//! - Tesseract (local, requires installation)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use retouch_server::ocr::{OcrService, OcrServiceConfig};
//!
//! let service = OcrService::new(OcrServiceConfig::default());
//!
//! // Check available providers
//! let providers = service.available_providers().await;
//!
//! // Detect text on a PNG page, first available provider wins
//! let detections = service.detect(&page_png, None).await?;
//! ```

mod provider;
mod service;
mod types;

pub use provider::{parse_rapidocr_response, parse_tesseract_tsv, OcrProviderTrait, RapidOcrProvider, TesseractProvider};
pub use service::{OcrService, OcrServiceConfig, ProviderStatus};
pub use types::{OcrError, OcrProvider, Point, TextDetection};

#[cfg(test)]
pub(crate) use provider::MockProvider;
