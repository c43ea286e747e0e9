//! OCR Providers
//!
//! Defines the provider trait and implementations for different OCR backends.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

use super::types::{OcrError, OcrProvider, Point, TextDetection};

/// OCR provider trait
#[async_trait]
pub trait OcrProviderTrait: Send + Sync {
    /// Get the provider type
    fn provider_type(&self) -> OcrProvider;

    /// Check if the provider is available
    async fn is_available(&self) -> bool;

    /// Detect and recognize all text instances in a PNG image
    async fn detect(&self, image_png: &[u8]) -> Result<Vec<TextDetection>, OcrError>;
}

// ============================================================================
// RapidOCR
// ============================================================================

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Large pages on CPU-only RapidOCR servers take tens of seconds
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// RapidOCR API provider
///
/// Talks to a `rapidocr_api` server, which runs PP-OCR detection and
/// recognition models and returns one polygon per text line.
pub struct RapidOcrProvider {
    /// API base URL
    base_url: String,
    client: reqwest::Client,
}

impl RapidOcrProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|e| {
                    tracing::warn!("Failed to build RapidOCR client ({}), using defaults", e);
                    reqwest::Client::new()
                }),
        }
    }
}

#[async_trait]
impl OcrProviderTrait for RapidOcrProvider {
    fn provider_type(&self) -> OcrProvider {
        OcrProvider::RapidOcr
    }

    async fn is_available(&self) -> bool {
        // Any HTTP answer means the server is up; the root path may 404
        self.client.get(&self.base_url).send().await.is_ok()
    }

    async fn detect(&self, image_png: &[u8]) -> Result<Vec<TextDetection>, OcrError> {
        let url = format!("{}/ocr", self.base_url);

        let part = reqwest::multipart::Part::bytes(image_png.to_vec())
            .file_name("page.png")
            .mime_str("image/png")
            .map_err(|e| OcrError::ApiError(format!("Failed to build request: {}", e)))?;
        let form = reqwest::multipart::Form::new().part("image_file", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| OcrError::ApiError(format!("Failed to call RapidOCR: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::ApiError(format!(
                "RapidOCR returned {}: {}",
                status, body
            )));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| OcrError::ApiError(format!("Failed to parse response: {}", e)))?;

        parse_rapidocr_response(&result)
    }
}

/// Parse a RapidOCR API reply.
///
/// The reply is an object keyed by detection index (`"0"`, `"1"`, ...), each
/// entry holding `rec_txt`, `dt_boxes` (list of `[x, y]`) and `score` (a
/// number or a numeric string). An empty object means nothing was found.
pub fn parse_rapidocr_response(value: &serde_json::Value) -> Result<Vec<TextDetection>, OcrError> {
    let entries = value
        .as_object()
        .ok_or_else(|| OcrError::ProcessingError("Expected a JSON object".to_string()))?;

    let mut indexed: Vec<(usize, &serde_json::Value)> = entries
        .iter()
        .filter_map(|(key, entry)| key.parse::<usize>().ok().map(|i| (i, entry)))
        .collect();
    indexed.sort_by_key(|(i, _)| *i);

    let mut detections = Vec::with_capacity(indexed.len());
    for (index, entry) in indexed {
        let text = entry["rec_txt"].as_str().unwrap_or("").to_string();

        let polygon: Vec<Point> = entry["dt_boxes"]
            .as_array()
            .map(|points| {
                points
                    .iter()
                    .filter_map(|p| Some(Point::new(p.get(0)?.as_f64()?, p.get(1)?.as_f64()?)))
                    .collect()
            })
            .unwrap_or_default();

        if polygon.is_empty() {
            tracing::debug!(index, "Skipping RapidOCR entry without box");
            continue;
        }

        let confidence = match &entry["score"] {
            serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
            serde_json::Value::String(s) => s.parse().unwrap_or(0.0),
            _ => 0.0,
        };

        detections.push(TextDetection {
            polygon,
            text,
            confidence,
        });
    }

    Ok(detections)
}

// ============================================================================
// Tesseract
// ============================================================================

/// Tesseract OCR provider
pub struct TesseractProvider {
    /// Default language
    default_language: String,
}

impl TesseractProvider {
    pub fn new(default_language: &str) -> Self {
        Self {
            default_language: default_language.to_string(),
        }
    }
}

#[async_trait]
impl OcrProviderTrait for TesseractProvider {
    fn provider_type(&self) -> OcrProvider {
        OcrProvider::Tesseract
    }

    async fn is_available(&self) -> bool {
        // Check if tesseract is installed
        tokio::process::Command::new("tesseract")
            .arg("--version")
            .output()
            .await
            .is_ok()
    }

    async fn detect(&self, image_png: &[u8]) -> Result<Vec<TextDetection>, OcrError> {
        // Create temporary file for image
        let input_path = std::env::temp_dir().join(format!("ocr_input_{}.png", uuid::Uuid::new_v4()));

        tokio::fs::write(&input_path, image_png)
            .await
            .map_err(|e| OcrError::ProcessingError(format!("Failed to write temp file: {}", e)))?;

        // Run tesseract with TSV output on stdout
        let output = tokio::process::Command::new("tesseract")
            .arg(&input_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.default_language)
            .arg("--psm")
            .arg("3")
            .arg("tsv")
            .output()
            .await;

        // Clean up input file
        let _ = tokio::fs::remove_file(&input_path).await;

        let output =
            output.map_err(|e| OcrError::ProcessingError(format!("Failed to run tesseract: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::ProcessingError(format!(
                "Tesseract failed: {}",
                stderr
            )));
        }

        Ok(parse_tesseract_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

#[derive(Default)]
struct LineAccumulator {
    words: Vec<String>,
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
    confidence_sum: f64,
    confidence_count: usize,
}

/// Group Tesseract TSV word rows into one detection per text line
pub fn parse_tesseract_tsv(tsv: &str) -> Vec<TextDetection> {
    let mut lines: BTreeMap<(u32, u32, u32, u32), LineAccumulator> = BTreeMap::new();

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }

        let text = cols[11].trim();
        if text.is_empty() {
            continue;
        }

        let num = |i: usize| cols[i].trim().parse::<f64>().ok();
        let (Some(left), Some(top), Some(width), Some(height)) = (num(6), num(7), num(8), num(9)) else {
            continue;
        };
        let key = |i: usize| cols[i].trim().parse::<u32>().unwrap_or(0);
        let line_key = (key(1), key(2), key(3), key(4));

        let line = lines.entry(line_key).or_insert_with(|| LineAccumulator {
            left: f64::MAX,
            top: f64::MAX,
            ..Default::default()
        });
        line.words.push(text.to_string());
        line.left = line.left.min(left);
        line.top = line.top.min(top);
        line.right = line.right.max(left + width);
        line.bottom = line.bottom.max(top + height);

        if let Some(conf) = num(10).filter(|c| *c >= 0.0) {
            line.confidence_sum += conf;
            line.confidence_count += 1;
        }
    }

    lines
        .into_values()
        .map(|line| {
            let confidence = if line.confidence_count > 0 {
                line.confidence_sum / line.confidence_count as f64 / 100.0
            } else {
                0.0
            };
            TextDetection::from_rect(
                line.left,
                line.top,
                line.right - line.left,
                line.bottom - line.top,
                line.words.join(" "),
                confidence,
            )
        })
        .collect()
}

// ============================================================================
// Mock provider for testing
// ============================================================================

/// Mock provider for testing
#[cfg(test)]
pub struct MockProvider {
    pub detections: Vec<TextDetection>,
    pub available: bool,
    pub fail: bool,
}

#[cfg(test)]
#[async_trait]
impl OcrProviderTrait for MockProvider {
    fn provider_type(&self) -> OcrProvider {
        OcrProvider::RapidOcr
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn detect(&self, _image_png: &[u8]) -> Result<Vec<TextDetection>, OcrError> {
        if self.fail {
            return Err(OcrError::ProcessingError("mock failure".to_string()));
        }
        Ok(self.detections.clone())
    }
}
