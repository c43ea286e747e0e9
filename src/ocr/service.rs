//! OCR Service
//!
//! Orchestrates OCR providers for page bitmaps.

use std::sync::Arc;

use serde::Serialize;

use super::{
    provider::{OcrProviderTrait, RapidOcrProvider, TesseractProvider},
    types::{OcrError, OcrProvider, TextDetection},
};

/// OCR service configuration
#[derive(Debug, Clone)]
pub struct OcrServiceConfig {
    /// Preferred provider order
    pub providers: Vec<OcrProvider>,
    /// RapidOCR API base URL
    pub rapidocr_url: String,
    /// Tesseract language codes (e.g. `chi_tra+eng`)
    pub tesseract_language: String,
}

impl Default for OcrServiceConfig {
    fn default() -> Self {
        Self {
            providers: vec![OcrProvider::RapidOcr, OcrProvider::Tesseract],
            rapidocr_url: "http://localhost:9003".to_string(),
            tesseract_language: "chi_tra+eng".to_string(),
        }
    }
}

/// Provider status as reported by the providers endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub provider: OcrProvider,
    pub available: bool,
}

/// OCR service for rendered pages
pub struct OcrService {
    providers: Vec<Arc<dyn OcrProviderTrait>>,
}

impl OcrService {
    /// Create a new OCR service with providers in configured order
    pub fn new(config: OcrServiceConfig) -> Self {
        let mut providers: Vec<Arc<dyn OcrProviderTrait>> = Vec::new();

        for provider in &config.providers {
            // Ignore duplicates in the configured list
            if providers.iter().any(|p| p.provider_type() == *provider) {
                continue;
            }
            match provider {
                OcrProvider::RapidOcr => {
                    providers.push(Arc::new(RapidOcrProvider::new(&config.rapidocr_url)))
                }
                OcrProvider::Tesseract => {
                    providers.push(Arc::new(TesseractProvider::new(&config.tesseract_language)))
                }
            }
        }

        tracing::info!(
            providers = ?providers.iter().map(|p| p.provider_type()).collect::<Vec<_>>(),
            "OCR service initialized"
        );

        Self { providers }
    }

    /// Build a service from ready-made providers
    pub fn with_providers(providers: Vec<Arc<dyn OcrProviderTrait>>) -> Self {
        Self { providers }
    }

    /// Get available providers
    pub async fn available_providers(&self) -> Vec<OcrProvider> {
        let mut available = Vec::new();
        for provider in &self.providers {
            if provider.is_available().await {
                available.push(provider.provider_type());
            }
        }
        available
    }

    /// Configured providers with their current availability
    pub async fn provider_status(&self) -> Vec<ProviderStatus> {
        let mut status = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            status.push(ProviderStatus {
                provider: provider.provider_type(),
                available: provider.is_available().await,
            });
        }
        status
    }

    /// Detect text on an encoded PNG page
    pub async fn detect(
        &self,
        image_png: &[u8],
        preferred_provider: Option<OcrProvider>,
    ) -> Result<Vec<TextDetection>, OcrError> {
        // If a specific provider is requested, use only that one
        if let Some(preferred) = preferred_provider {
            let provider = self
                .providers
                .iter()
                .find(|p| p.provider_type() == preferred)
                .ok_or_else(|| {
                    OcrError::ProviderNotAvailable(format!(
                        "{} provider is not configured",
                        preferred.name()
                    ))
                })?;

            if !provider.is_available().await {
                return Err(OcrError::ProviderNotAvailable(format!(
                    "{} provider is not available",
                    preferred.name()
                )));
            }
            return provider.detect(image_png).await;
        }

        // Try providers in order
        for provider in &self.providers {
            if !provider.is_available().await {
                tracing::debug!(provider = provider.provider_type().name(), "OCR provider unavailable");
                continue;
            }
            match provider.detect(image_png).await {
                Ok(detections) => {
                    tracing::debug!(
                        provider = provider.provider_type().name(),
                        count = detections.len(),
                        "OCR finished"
                    );
                    return Ok(detections);
                }
                Err(e) => {
                    tracing::warn!(
                        "OCR provider {:?} failed: {}, trying next",
                        provider.provider_type(),
                        e
                    );
                }
            }
        }

        Err(OcrError::ProviderNotAvailable(
            "No OCR providers available".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::provider::MockProvider;

    fn mock(available: bool, fail: bool, text: &str) -> Arc<dyn OcrProviderTrait> {
        Arc::new(MockProvider {
            detections: vec![TextDetection::from_rect(1.0, 2.0, 30.0, 10.0, text, 0.9)],
            available,
            fail,
        })
    }

    #[tokio::test]
    async fn test_ocr_service_creation() {
        let service = OcrService::new(OcrServiceConfig {
            providers: vec![OcrProvider::Tesseract, OcrProvider::Tesseract],
            ..Default::default()
        });

        assert_eq!(service.providers.len(), 1);
        assert_eq!(service.providers[0].provider_type(), OcrProvider::Tesseract);
    }

    #[tokio::test]
    async fn test_falls_back_to_next_provider() {
        let service = OcrService::with_providers(vec![
            mock(false, false, "offline"),
            mock(true, true, "broken"),
            mock(true, false, "ok"),
        ]);

        let detections = service.detect(b"png", None).await.unwrap();
        assert_eq!(detections[0].text, "ok");
    }

    #[tokio::test]
    async fn test_no_provider_available() {
        let service = OcrService::with_providers(vec![mock(false, false, "x")]);

        let result = service.detect(b"png", None).await;
        assert!(matches!(result, Err(OcrError::ProviderNotAvailable(_))));
        assert!(service.available_providers().await.is_empty());
    }

    #[tokio::test]
    async fn test_preferred_provider_not_configured() {
        let service = OcrService::with_providers(vec![mock(true, false, "x")]);

        let result = service.detect(b"png", Some(OcrProvider::Tesseract)).await;
        assert!(matches!(result, Err(OcrError::ProviderNotAvailable(_))));
    }

    #[tokio::test]
    async fn test_preferred_provider_is_used() {
        let service = OcrService::with_providers(vec![mock(true, false, "page")]);

        let detections = service.detect(b"png", Some(OcrProvider::RapidOcr)).await.unwrap();
        assert_eq!(detections[0].text, "page");

        let status = service.provider_status().await;
        assert!(status[0].available);
    }
}
