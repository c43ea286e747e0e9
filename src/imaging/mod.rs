//! Page bitmap processing
//!
//! Everything that touches page pixels goes through this module:
//!
//! - `sanitize`: normalize any decoded image to opaque RGB
//! - `color`: `#rrggbb` parsing for region colors
//! - `fonts`: bundled TrueType font loading with a built-in fallback
//! - `draw`: region erasing and outlined text drawing

mod color;
mod draw;
mod fonts;
mod sanitize;

pub use color::parse_hex_color;
pub use draw::{draw_text, erase_box, TextStyle};
pub use fonts::{FontBook, FontFace};
pub use sanitize::{decode_png, encode_png, sanitize_bytes, sanitize_image};

/// Imaging error types
#[derive(Debug, thiserror::Error)]
pub enum ImagingError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Invalid color '{0}': expected #rrggbb")]
    InvalidColor(String),
}

impl ImagingError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::InvalidColor(_) => StatusCode::BAD_REQUEST,
            Self::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<image::ImageError> for ImagingError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Encoding(e) => ImagingError::Encode(e.to_string()),
            other => ImagingError::Decode(other.to_string()),
        }
    }
}
