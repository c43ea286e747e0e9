//! Image-only PDF writer

use std::io::Cursor;

use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::{Image, ImageTransform, Mm, PdfDocument, Px};

use super::ExportError;

const MM_PER_INCH: f32 = 25.4;

/// Build a PDF with one page per PNG, each page exactly the size of its
/// image at `dpi`.
pub fn images_to_pdf(pages: &[Vec<u8>], dpi: f32, title: &str) -> Result<Vec<u8>, ExportError> {
    let (first, rest) = pages.split_first().ok_or(ExportError::NoPages)?;

    let image = decode(first)?;
    let (width, height) = page_size(&image, dpi);
    let (doc, page, layer) = PdfDocument::new(title, width, height, "Layer 1");
    image.add_to_layer(doc.get_page(page).get_layer(layer), transform(dpi));

    for bytes in rest {
        let image = decode(bytes)?;
        let (width, height) = page_size(&image, dpi);
        let (page, layer) = doc.add_page(width, height, "Layer 1");
        image.add_to_layer(doc.get_page(page).get_layer(layer), transform(dpi));
    }

    doc.save_to_bytes().map_err(|e| ExportError::Pdf(e.to_string()))
}

fn decode(png: &[u8]) -> Result<Image, ExportError> {
    let mut reader = Cursor::new(png);
    let decoder = PngDecoder::new(&mut reader).map_err(|e| ExportError::Image(e.to_string()))?;
    Image::try_from(decoder).map_err(|e| ExportError::Image(e.to_string()))
}

fn px_to_mm(px: Px, dpi: f32) -> Mm {
    Mm(px.0 as f32 * MM_PER_INCH / dpi)
}

fn page_size(image: &Image, dpi: f32) -> (Mm, Mm) {
    (px_to_mm(image.image.width, dpi), px_to_mm(image.image.height, dpi))
}

fn transform(dpi: f32) -> ImageTransform {
    ImageTransform {
        dpi: Some(dpi),
        ..Default::default()
    }
}
