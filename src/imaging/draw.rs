//! Region erasing and text drawing on page bitmaps

use ab_glyph::{Font, PxScale, ScaleFont};
use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use super::fonts::FontFace;

/// Extra pixels between lines of multi-line text
const LINE_SPACING: f32 = 4.0;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Appearance of drawn text
#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    /// Font size in pixels
    pub size: f32,
    /// Fill and outline color
    pub color: Rgb<u8>,
    /// Outline radius in pixels (0 = no outline)
    pub stroke_width: u32,
}

/// Fill a box with white.
///
/// Both corners are inclusive. Coordinates are rounded to the nearest pixel
/// and clamped to the image; a box entirely outside the image is a no-op.
pub fn erase_box(image: &mut RgbImage, x0: f64, top: f64, x1: f64, bottom: f64) {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    let left = x0.min(x1).round().max(0.0);
    let right = x0.max(x1).round().min((width - 1) as f64);
    let upper = top.min(bottom).round().max(0.0);
    let lower = top.max(bottom).round().min((height - 1) as f64);

    if right < left || lower < upper {
        return;
    }

    let rect = Rect::at(left as i32, upper as i32)
        .of_size((right - left) as u32 + 1, (lower - upper) as u32 + 1);
    draw_filled_rect_mut(image, rect, WHITE);
}

/// Draw `text` with its top-left corner at `(x, y)`.
///
/// Lines are split on `\n`. A non-zero stroke width thickens every glyph by
/// redrawing it at each offset within that radius, in the fill color.
pub fn draw_text(image: &mut RgbImage, face: &FontFace<'_>, text: &str, x: i32, y: i32, style: &TextStyle) {
    let line_height = match face {
        FontFace::TrueType(font) => font.as_scaled(PxScale::from(style.size)).height() + LINE_SPACING,
        FontFace::Builtin => builtin_cell(style.size) * 8.0 + LINE_SPACING,
    };
    let offsets = stroke_offsets(style.stroke_width);

    for (index, line) in text.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let line_y = y + (index as f32 * line_height).round() as i32;

        for &(dx, dy) in &offsets {
            match face {
                FontFace::TrueType(font) => draw_text_mut(
                    image,
                    style.color,
                    x + dx,
                    line_y + dy,
                    PxScale::from(style.size),
                    *font,
                    line,
                ),
                FontFace::Builtin => draw_builtin_line(image, line, x + dx, line_y + dy, style),
            }
        }
    }
}

/// Pixel offsets covering a filled disk of the given radius
fn stroke_offsets(radius: u32) -> Vec<(i32, i32)> {
    let r = radius as i32;
    let mut offsets = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r * r {
                offsets.push((dx, dy));
            }
        }
    }
    offsets
}

fn builtin_cell(size: f32) -> f32 {
    (size / 8.0).max(1.0)
}

fn builtin_glyph(ch: char) -> [u8; 8] {
    BASIC_FONTS
        .get(ch)
        .or_else(|| LATIN_FONTS.get(ch))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

fn draw_builtin_line(image: &mut RgbImage, line: &str, x: i32, y: i32, style: &TextStyle) {
    let cell = builtin_cell(style.size);
    let block = cell.ceil() as u32;

    for (column, ch) in line.chars().enumerate() {
        let glyph_x = x as f32 + column as f32 * 8.0 * cell;
        for (row, bits) in builtin_glyph(ch).iter().enumerate() {
            for bit in 0..8 {
                if bits & (1 << bit) == 0 {
                    continue;
                }
                let px = (glyph_x + bit as f32 * cell).round() as i32;
                let py = (y as f32 + row as f32 * cell).round() as i32;
                draw_filled_rect_mut(image, Rect::at(px, py).of_size(block, block), style.color);
            }
        }
    }
}
