//! In-memory page source for tests

use std::sync::atomic::{AtomicUsize, Ordering};

use image::{DynamicImage, Rgba, RgbaImage};

use super::{PageRasterizer, RenderError};

/// Reference resolution for `width`/`height`
const BASE_DPI: f32 = 150.0;

/// Pages with a transparent background and one opaque marker pixel per page.
///
/// Page `i` has an opaque pixel at `(i % width, 0)` with red channel `i`, so
/// exported pages can be told apart after sanitizing.
pub struct FakePages {
    count: usize,
    width: u32,
    height: u32,
    renders: AtomicUsize,
}

impl FakePages {
    /// Pages of `width` x `height` pixels at 150 DPI
    pub fn new(count: usize, width: u32, height: u32) -> Self {
        Self {
            count,
            width,
            height,
            renders: AtomicUsize::new(0),
        }
    }

    /// How many times a page was rendered
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    /// Marker pixel of page `index`
    pub fn marker(index: usize) -> (u32, Rgba<u8>) {
        (index as u32, Rgba([index as u8, 0, 0, 255]))
    }
}

impl PageRasterizer for FakePages {
    fn page_count(&self) -> usize {
        self.count
    }

    fn render_page(&self, index: usize, dpi: f32) -> Result<DynamicImage, RenderError> {
        self.check_page(index)?;
        self.renders.fetch_add(1, Ordering::SeqCst);

        let scale = dpi / BASE_DPI;
        let width = ((self.width as f32 * scale).round() as u32).max(1);
        let height = ((self.height as f32 * scale).round() as u32).max(1);

        let mut image = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
        let (x, color) = Self::marker(index);
        image.put_pixel(x % width, 0, color);

        Ok(DynamicImage::ImageRgba8(image))
    }
}
