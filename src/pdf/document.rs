//! MuPDF-backed PDF document
//!
//! MuPDF documents are not thread-safe. `PdfDocument` keeps only the source
//! bytes and opens a fresh MuPDF document for each operation, with access
//! serialized through a `parking_lot::Mutex`.

use std::sync::Arc;

use image::{DynamicImage, RgbaImage};
use mupdf::{Colorspace, Document, Matrix};
use parking_lot::Mutex;

use super::{PageRasterizer, RenderError};

const PDF_MIME: &str = "application/pdf";

/// PDF points per inch
const POINTS_PER_INCH: f32 = 72.0;

/// Rendering resolution bounds
const MIN_DPI: f32 = 10.0;
const MAX_DPI: f32 = 600.0;

/// Uploaded PDF held in memory
pub struct PdfDocument {
    /// Raw PDF bytes
    data: Arc<Vec<u8>>,
    /// Cached page count
    page_count: usize,
    /// Mutex for serializing access
    lock: Mutex<()>,
}

impl PdfDocument {
    /// Validate and wrap uploaded PDF bytes
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, RenderError> {
        if !data.starts_with(b"%PDF") {
            return Err(RenderError::NotPdf);
        }

        let doc = Document::from_bytes(&data, PDF_MIME)
            .map_err(|e| RenderError::LoadError(e.to_string()))?;
        let page_count = doc
            .page_count()
            .map_err(|e| RenderError::LoadError(e.to_string()))? as usize;

        if page_count == 0 {
            return Err(RenderError::LoadError("PDF has no pages".to_string()));
        }

        Ok(Self {
            data: Arc::new(data),
            page_count,
            lock: Mutex::new(()),
        })
    }

    /// Execute a closure with a freshly opened document
    fn with_doc<F, R>(&self, f: F) -> Result<R, RenderError>
    where
        F: FnOnce(&Document) -> Result<R, RenderError>,
    {
        let _guard = self.lock.lock();
        let doc = Document::from_bytes(&self.data, PDF_MIME)?;
        f(&doc)
    }
}

impl PageRasterizer for PdfDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn render_page(&self, index: usize, dpi: f32) -> Result<DynamicImage, RenderError> {
        self.check_page(index)?;

        let scale = dpi.clamp(MIN_DPI, MAX_DPI) / POINTS_PER_INCH;

        self.with_doc(|doc| {
            let page = doc.load_page(index as i32)?;
            let matrix = Matrix::new_scale(scale, scale);
            let colorspace = Colorspace::device_rgb();
            let pixmap = page.to_pixmap(&matrix, &colorspace, true, true)?;

            let image = pixmap_to_rgba(&pixmap)?;
            tracing::trace!(
                page = index,
                dpi,
                width = image.width(),
                height = image.height(),
                "Rendered page"
            );
            Ok(DynamicImage::ImageRgba8(image))
        })
    }
}

/// Copy MuPDF pixmap samples into an RGBA buffer
fn pixmap_to_rgba(pixmap: &mupdf::Pixmap) -> Result<RgbaImage, RenderError> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    let mut rgba_buffer = Vec::with_capacity((width * height * 4) as usize);

    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = (y * width as usize + x) * n;
            let r = samples.get(offset).copied().unwrap_or(0);
            let g = samples.get(offset + 1).copied().unwrap_or(0);
            let b = samples.get(offset + 2).copied().unwrap_or(0);
            let a = if n >= 4 {
                samples.get(offset + 3).copied().unwrap_or(255)
            } else {
                255
            };
            rgba_buffer.extend_from_slice(&[r, g, b, a]);
        }
    }

    RgbaImage::from_raw(width, height, rgba_buffer)
        .ok_or_else(|| RenderError::ImageError("Failed to create image buffer".to_string()))
}
