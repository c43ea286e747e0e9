//! Rendered page cache
//!
//! Untouched pages are re-rendered on every interaction that needs them
//! (display, first commit, export). `RenderCache` wraps any page source and
//! keeps the most recent renders in an LRU cache keyed by page and DPI.

use std::num::NonZeroUsize;
use std::sync::Arc;

use image::DynamicImage;
use lru::LruCache;
use parking_lot::Mutex;

use super::{PageRasterizer, RenderError};

/// Cache key for rendered pages
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
struct RenderKey {
    page: usize,
    /// DPI * 100 as integer for hashing
    dpi: u32,
}

impl RenderKey {
    fn new(page: usize, dpi: f32) -> Self {
        Self {
            page,
            dpi: (dpi * 100.0) as u32,
        }
    }
}

/// LRU cache in front of a page source
pub struct RenderCache {
    inner: Arc<dyn PageRasterizer>,
    renders: Mutex<LruCache<RenderKey, Arc<DynamicImage>>>,
}

impl RenderCache {
    /// Wrap a page source, keeping at most `capacity` renders
    pub fn new(inner: Arc<dyn PageRasterizer>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            renders: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of renders currently cached
    pub fn len(&self) -> usize {
        self.renders.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PageRasterizer for RenderCache {
    fn page_count(&self) -> usize {
        self.inner.page_count()
    }

    fn render_page(&self, index: usize, dpi: f32) -> Result<DynamicImage, RenderError> {
        let key = RenderKey::new(index, dpi);

        if let Some(hit) = self.renders.lock().get(&key) {
            tracing::trace!(page = index, dpi, "Render cache hit");
            return Ok(hit.as_ref().clone());
        }

        // Render outside the cache lock so other pages are not blocked
        let image = self.inner.render_page(index, dpi)?;
        self.renders.lock().put(key, Arc::new(image.clone()));
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fake::FakePages;

    #[test]
    fn test_repeated_renders_hit_cache() {
        let pages = Arc::new(FakePages::new(3, 20, 30));
        let cache = RenderCache::new(pages.clone(), 4);

        let first = cache.render_page(1, 150.0).unwrap();
        let second = cache.render_page(1, 150.0).unwrap();

        assert_eq!(first, second);
        assert_eq!(pages.render_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_dpi_is_part_of_key() {
        let pages = Arc::new(FakePages::new(1, 20, 30));
        let cache = RenderCache::new(pages.clone(), 4);

        cache.render_page(0, 150.0).unwrap();
        cache.render_page(0, 40.0).unwrap();

        assert_eq!(pages.render_count(), 2);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let pages = Arc::new(FakePages::new(3, 10, 10));
        let cache = RenderCache::new(pages.clone(), 2);

        cache.render_page(0, 150.0).unwrap();
        cache.render_page(1, 150.0).unwrap();
        cache.render_page(2, 150.0).unwrap();
        cache.render_page(0, 150.0).unwrap();

        assert_eq!(pages.render_count(), 4);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let pages = Arc::new(FakePages::new(1, 10, 10));
        let cache = RenderCache::new(pages, 2);

        let result = cache.render_page(5, 150.0);
        assert!(matches!(result, Err(RenderError::PageNotFound { page: 5, count: 1 })));
        assert!(cache.is_empty());
    }
}
