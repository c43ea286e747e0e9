//! Retouch Server Library
//!
//! Self-hosted PDF retouching: pages are rendered to bitmaps, OCR finds the
//! text lines, and each line can be erased and redrawn with new text before
//! the document is exported again as PDF or PPTX.
//!
//! # Modules
//!
//! - `pdf`: Page rasterization via MuPDF, with an LRU cache
//! - `imaging`: Bitmap sanitization, color parsing, erase and text drawing
//! - `ocr`: OCR providers (RapidOCR, Tesseract) with fallback
//! - `session`: Edit sessions, regions, per-page undo/redo
//! - `export`: PDF and PPTX writers
//! - `routes`: HTTP API

pub mod config;
pub mod error;
pub mod export;
pub mod imaging;
pub mod ocr;
pub mod pdf;
pub mod routes;
pub mod session;
pub mod state;
