//! Application state management

use std::sync::Arc;

use chrono::Duration;
use tokio::sync::OnceCell;

use crate::config::Config;
use crate::imaging::FontBook;
use crate::ocr::OcrService;
use crate::session::SessionManager;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    sessions: SessionManager,
    fonts: Arc<FontBook>,
    /// Built on first analyze request, then reused
    ocr: OnceCell<Arc<OcrService>>,
}

impl AppState {
    /// Create a new application state, loading the bundled fonts
    pub fn new(config: Config) -> Self {
        let fonts = FontBook::load(&config.fonts.dir, &config.fonts.regular, &config.fonts.bold);
        Self::with_parts(config, fonts, None)
    }

    /// Build state from ready-made parts; `ocr` skips lazy construction
    pub fn with_parts(config: Config, fonts: FontBook, ocr: Option<Arc<OcrService>>) -> Self {
        let sessions = SessionManager::new(
            config.editor_settings(),
            config.sessions.max_sessions,
            Duration::try_minutes(config.sessions.ttl_minutes).unwrap_or_else(|| Duration::hours(2)),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                sessions,
                fonts: Arc::new(fonts),
                ocr: OnceCell::new_with(ocr),
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the session manager
    pub fn sessions(&self) -> &SessionManager {
        &self.inner.sessions
    }

    /// Get the loaded fonts
    pub fn fonts(&self) -> Arc<FontBook> {
        self.inner.fonts.clone()
    }

    /// Get the OCR service, creating it on first use
    pub async fn ocr(&self) -> Arc<OcrService> {
        self.inner
            .ocr
            .get_or_init(|| async {
                tracing::info!("Initializing OCR service");
                Arc::new(OcrService::new(self.inner.config.ocr_service_config()))
            })
            .await
            .clone()
    }
}
