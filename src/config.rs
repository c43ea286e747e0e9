//! Configuration management for the Retouch server

use std::env;
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

use crate::ocr::{OcrProvider, OcrServiceConfig};
use crate::session::EditorSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub render: RenderConfig,
    pub fonts: FontConfig,
    pub ocr: OcrConfig,
    pub sessions: SessionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted upload
    pub max_upload_mb: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    /// Resolution of edited and exported pages
    pub dpi: f32,
    pub thumbnail_dpi: f32,
    /// Canvas overlay width in display pixels
    pub display_width: u32,
    /// Pristine renders kept per document
    pub cache_pages: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FontConfig {
    pub dir: PathBuf,
    pub regular: String,
    pub bold: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    pub providers: Vec<OcrProvider>,
    pub rapidocr_url: String,
    pub tesseract_lang: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub history_limit: usize,
    pub ttl_minutes: i64,
    /// 0 = unlimited
    pub max_sessions: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                max_upload_mb: 200,
            },
            render: RenderConfig {
                dpi: 150.0,
                thumbnail_dpi: 40.0,
                display_width: 800,
                cache_pages: 16,
            },
            fonts: FontConfig {
                dir: PathBuf::from("fonts"),
                regular: "msjh.ttc".to_string(),
                bold: "msjhbd.ttc".to_string(),
            },
            ocr: OcrConfig {
                providers: vec![OcrProvider::RapidOcr, OcrProvider::Tesseract],
                rapidocr_url: "http://localhost:9003".to_string(),
                tesseract_lang: "chi_tra+eng".to_string(),
            },
            sessions: SessionConfig {
                history_limit: 10,
                ttl_minutes: 120,
                max_sessions: 64,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var_in("SERVER_PORT", defaults.server.port, 1..=u16::MAX),
                max_upload_mb: parse_var_in("MAX_UPLOAD_MB", defaults.server.max_upload_mb, 1..=4096),
            },
            render: RenderConfig {
                dpi: parse_var_in("RENDER_DPI", defaults.render.dpi, 36.0..=600.0),
                thumbnail_dpi: parse_var_in("THUMBNAIL_DPI", defaults.render.thumbnail_dpi, 10.0..=300.0),
                display_width: parse_var_in("DISPLAY_WIDTH", defaults.render.display_width, 100..=8000),
                cache_pages: parse_var_in("RENDER_CACHE_PAGES", defaults.render.cache_pages, 1..=1024),
            },
            fonts: FontConfig {
                dir: env::var("FONT_DIR").map(PathBuf::from).unwrap_or(defaults.fonts.dir),
                regular: env::var("FONT_FILE").unwrap_or(defaults.fonts.regular),
                bold: env::var("FONT_BOLD_FILE").unwrap_or(defaults.fonts.bold),
            },
            ocr: OcrConfig {
                providers: env::var("OCR_PROVIDERS")
                    .map(|value| parse_providers(&value))
                    .unwrap_or(defaults.ocr.providers),
                rapidocr_url: env::var("RAPIDOCR_URL").unwrap_or(defaults.ocr.rapidocr_url),
                tesseract_lang: env::var("TESSERACT_LANG").unwrap_or(defaults.ocr.tesseract_lang),
            },
            sessions: SessionConfig {
                history_limit: parse_var_in("HISTORY_LIMIT", defaults.sessions.history_limit, 1..=100),
                ttl_minutes: parse_var_in("SESSION_TTL_MINUTES", defaults.sessions.ttl_minutes, 1..=MAX_TTL_MINUTES),
                max_sessions: parse_var_in("MAX_SESSIONS", defaults.sessions.max_sessions, 0..=100_000),
            },
        }
    }

    pub fn editor_settings(&self) -> EditorSettings {
        EditorSettings {
            render_dpi: self.render.dpi,
            thumbnail_dpi: self.render.thumbnail_dpi,
            display_width: self.render.display_width,
            history_limit: self.sessions.history_limit,
        }
    }

    pub fn ocr_service_config(&self) -> OcrServiceConfig {
        OcrServiceConfig {
            providers: self.ocr.providers.clone(),
            rapidocr_url: self.ocr.rapidocr_url.clone(),
            tesseract_language: self.ocr.tesseract_lang.clone(),
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.server.max_upload_mb * 1024 * 1024
    }
}

/// One week
pub const MAX_TTL_MINUTES: i64 = 7 * 24 * 60;

/// Read and parse an environment variable, falling back to `default` when
/// it is unparseable or outside `range`
fn parse_var_in<T>(key: &str, default: T, range: RangeInclusive<T>) -> T
where
    T: FromStr + PartialOrd + Display,
{
    match env::var(key) {
        Ok(value) => parse_in(key, &value, default, range),
        Err(_) => default,
    }
}

fn parse_in<T>(key: &str, value: &str, default: T, range: RangeInclusive<T>) -> T
where
    T: FromStr + PartialOrd + Display,
{
    match value.trim().parse::<T>() {
        Ok(parsed) if range.contains(&parsed) => parsed,
        Ok(_) => {
            tracing::warn!(
                key,
                value,
                min = %range.start(),
                max = %range.end(),
                "Configuration value out of range, using default"
            );
            default
        }
        Err(_) => {
            tracing::warn!(key, value, "Invalid configuration value, using default");
            default
        }
    }
}

/// Comma-separated provider list; unknown names are skipped
fn parse_providers(value: &str) -> Vec<OcrProvider> {
    value
        .split(',')
        .filter(|name| !name.trim().is_empty())
        .filter_map(|name| {
            let provider = OcrProvider::from_name(name);
            if provider.is_none() {
                tracing::warn!(name = name.trim(), "Unknown OCR provider in OCR_PROVIDERS");
            }
            provider
        })
        .collect()
}
