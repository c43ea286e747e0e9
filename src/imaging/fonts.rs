//! Font loading
//!
//! Edits are drawn with a bundled TrueType font (a `.ttf` or `.ttc` file in
//! the configured font directory). When the bundled font is absent or cannot
//! be parsed the built-in 8x8 bitmap font is used instead; loading never
//! fails.

use std::path::Path;

use ab_glyph::FontVec;

/// Loaded fonts, shared by every session
pub struct FontBook {
    regular: Option<FontVec>,
    bold: Option<FontVec>,
}

/// Font selected for one drawing call
pub enum FontFace<'a> {
    /// Bundled TrueType font
    TrueType(&'a FontVec),
    /// Built-in bitmap font
    Builtin,
}

impl FontBook {
    /// Load the bundled fonts from `dir`.
    ///
    /// A missing bold face falls back to the regular face; a missing or
    /// broken regular face falls back to the built-in font.
    pub fn load(dir: &Path, regular_file: &str, bold_file: &str) -> Self {
        let regular = load_font(&dir.join(regular_file));
        let bold = if regular.is_some() {
            load_font(&dir.join(bold_file))
        } else {
            None
        };

        match (&regular, &bold) {
            (Some(_), Some(_)) => tracing::info!(dir = %dir.display(), "Loaded regular and bold fonts"),
            (Some(_), None) => tracing::info!(dir = %dir.display(), "Loaded regular font; bold uses regular"),
            _ => tracing::warn!(dir = %dir.display(), "No bundled font available, using built-in font"),
        }

        Self { regular, bold }
    }

    /// Font book that only has the built-in bitmap font
    pub fn builtin() -> Self {
        Self {
            regular: None,
            bold: None,
        }
    }

    /// Whether a bundled TrueType font is available
    pub fn has_truetype(&self) -> bool {
        self.regular.is_some()
    }

    /// Pick the face for a drawing call
    pub fn face(&self, bold: bool) -> FontFace<'_> {
        let font = if bold {
            self.bold.as_ref().or(self.regular.as_ref())
        } else {
            self.regular.as_ref()
        };

        match font {
            Some(font) => FontFace::TrueType(font),
            None => FontFace::Builtin,
        }
    }
}

fn load_font(path: &Path) -> Option<FontVec> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "Font file not found");
        return None;
    }

    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!(path = %path.display(), "Failed to read font: {}", e);
            return None;
        }
    };

    // Index 0 covers both plain TrueType files and the first face of a collection
    match FontVec::try_from_vec_and_index(data, 0) {
        Ok(font) => Some(font),
        Err(e) => {
            tracing::warn!(path = %path.display(), "Failed to parse font: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_directory_falls_back_to_builtin() {
        let book = FontBook::load(Path::new("/nonexistent/fonts"), "msjh.ttc", "msjhbd.ttc");
        assert!(!book.has_truetype());
        assert!(matches!(book.face(false), FontFace::Builtin));
        assert!(matches!(book.face(true), FontFace::Builtin));
    }

    #[test]
    fn test_bundled_font_without_bold_face() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/fonts");
        let book = FontBook::load(&dir, "DejaVuSansMono.ttf", "missing-bold.ttf");

        assert!(book.has_truetype());
        assert!(matches!(book.face(false), FontFace::TrueType(_)));
        assert!(matches!(book.face(true), FontFace::TrueType(_)));
    }

    #[test]
    fn test_corrupt_font_falls_back_to_builtin() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("msjh.ttc"), b"not a font").unwrap();

        let book = FontBook::load(dir.path(), "msjh.ttc", "msjhbd.ttc");
        assert!(!book.has_truetype());
        assert!(matches!(book.face(false), FontFace::Builtin));
    }
}
