//! Page source trait

use image::DynamicImage;

use super::RenderError;

/// Something that can turn document pages into bitmaps.
///
/// Implementations are blocking; async callers run them on
/// `tokio::task::spawn_blocking`.
pub trait PageRasterizer: Send + Sync {
    /// Number of pages in the document
    fn page_count(&self) -> usize;

    /// Render a page (0-indexed) at the given resolution.
    ///
    /// The returned bitmap may be in any pixel layout, including RGBA with a
    /// transparent background; callers sanitize it before use.
    fn render_page(&self, index: usize, dpi: f32) -> Result<DynamicImage, RenderError>;

    /// Fail with `PageNotFound` unless `index` is a valid page
    fn check_page(&self, index: usize) -> Result<(), RenderError> {
        let count = self.page_count();
        if index >= count {
            return Err(RenderError::PageNotFound { page: index, count });
        }
        Ok(())
    }
}
