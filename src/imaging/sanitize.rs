//! Image sanitization
//!
//! Page bitmaps arrive in whatever pixel layout the rasterizer or an upload
//! produced: palette, gray, gray+alpha, RGBA with a transparent background,
//! 16-bit channels. Browser canvases draw transparent or palette images as
//! black or with wrong colors, so every bitmap is flattened onto white and
//! normalized to 8-bit RGB before it is displayed, edited or exported.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, RgbaImage};

use super::ImagingError;

/// Produce an opaque RGB copy of `image` with identical dimensions.
///
/// Transparent pixels are composited onto white. The result is round-tripped
/// through PNG so the returned buffer is always a freshly decoded `Rgb8`
/// image. Already-RGB input is passed through unchanged.
pub fn sanitize_image(image: &DynamicImage) -> Result<RgbImage, ImagingError> {
    let flattened = match image {
        DynamicImage::ImageRgb8(rgb) => rgb.clone(),
        other => flatten_onto_white(&other.to_rgba8()),
    };

    let png = encode_png(&flattened)?;
    decode_png(&png)
}

/// Decode an encoded image of any supported format and sanitize it
pub fn sanitize_bytes(data: &[u8]) -> Result<RgbImage, ImagingError> {
    let image = image::load_from_memory(data)?;
    sanitize_image(&image)
}

/// Encode an RGB image as PNG
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, ImagingError> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| ImagingError::Encode(e.to_string()))?;
    Ok(buffer)
}

/// Decode PNG bytes into an RGB image
pub fn decode_png(data: &[u8]) -> Result<RgbImage, ImagingError> {
    let image = image::load_from_memory_with_format(data, ImageFormat::Png)?;
    Ok(image.into_rgb8())
}

fn flatten_onto_white(rgba: &RgbaImage) -> RgbImage {
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        out.put_pixel(x, y, Rgb([blend(r, a), blend(g, a), blend(b, a)]));
    }
    out
}

/// Alpha-blend one channel over a white background
fn blend(channel: u8, alpha: u8) -> u8 {
    let c = channel as u32;
    let a = alpha as u32;
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayAlphaImage, ImageBuffer, Luma, LumaA, Rgba};

    #[test]
    fn test_rgb_input_is_unchanged() {
        let mut img = RgbImage::new(4, 3);
        for (x, y, p) in img.enumerate_pixels_mut() {
            *p = Rgb([(x * 40) as u8, (y * 70) as u8, 200]);
        }

        let once = sanitize_image(&DynamicImage::ImageRgb8(img.clone())).unwrap();
        assert_eq!(once, img);

        let twice = sanitize_image(&DynamicImage::ImageRgb8(once.clone())).unwrap();
        assert_eq!(twice, once);
    }

    #[test]
    fn test_transparent_pixels_become_white() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([12, 34, 56, 0]));
        img.put_pixel(1, 0, Rgba([200, 10, 30, 255]));

        let out = sanitize_image(&DynamicImage::ImageRgba8(img)).unwrap();

        assert_eq!(out.dimensions(), (2, 1));
        assert_eq!(out.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(out.get_pixel(1, 0), &Rgb([200, 10, 30]));
    }

    #[test]
    fn test_half_transparent_black_is_mid_gray() {
        let mut img = RgbaImage::new(1, 1);
        img.put_pixel(0, 0, Rgba([0, 0, 0, 128]));

        let out = sanitize_image(&DynamicImage::ImageRgba8(img)).unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgb([127, 127, 127]));
    }

    #[test]
    fn test_gray_alpha_input_is_flattened() {
        let mut img = GrayAlphaImage::new(1, 2);
        img.put_pixel(0, 0, LumaA([0, 255]));
        img.put_pixel(0, 1, LumaA([0, 0]));

        let out = sanitize_image(&DynamicImage::ImageLumaA8(img)).unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(0, 1), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_sanitize_bytes_decodes_rgba_png() {
        let mut img = RgbaImage::new(3, 3);
        img.put_pixel(1, 1, Rgba([0, 128, 0, 255]));
        let mut png = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();

        let out = sanitize_bytes(&png).unwrap();
        assert_eq!(out.get_pixel(1, 1), &Rgb([0, 128, 0]));
        assert_eq!(out.get_pixel(0, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_indexed_png_with_transparency() {
        // Palette: 0 = red (fully transparent via tRNS), 1 = blue (opaque)
        let mut png = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut png, 2, 2);
            encoder.set_color(png::ColorType::Indexed);
            encoder.set_depth(png::BitDepth::Eight);
            encoder.set_palette(vec![255u8, 0, 0, 0, 0, 255]);
            encoder.set_trns(vec![0u8, 255]);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(&[0, 1, 1, 0]).unwrap();
            writer.finish().unwrap();
        }

        let out = sanitize_bytes(&png).unwrap();
        assert_eq!(out.dimensions(), (2, 2));
        assert_eq!(out.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(out.get_pixel(1, 0), &Rgb([0, 0, 255]));
        assert_eq!(out.get_pixel(0, 1), &Rgb([0, 0, 255]));
        assert_eq!(out.get_pixel(1, 1), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_sixteen_bit_rgba_is_flattened() {
        let mut img: ImageBuffer<Rgba<u16>, Vec<u16>> = ImageBuffer::new(2, 1);
        img.put_pixel(0, 0, Rgba([65535, 0, 0, 65535]));
        img.put_pixel(1, 0, Rgba([0, 0, 65535, 0]));

        let out = sanitize_image(&DynamicImage::ImageRgba16(img)).unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(out.get_pixel(1, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_sixteen_bit_gray_is_expanded() {
        let mut img: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::new(2, 1);
        img.put_pixel(0, 0, Luma([0]));
        img.put_pixel(1, 0, Luma([65535]));

        let out = sanitize_image(&DynamicImage::ImageLuma16(img)).unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(1, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_float_rgb_is_quantized() {
        let mut img: ImageBuffer<Rgb<f32>, Vec<f32>> = ImageBuffer::new(2, 1);
        img.put_pixel(0, 0, Rgb([1.0, 0.0, 0.0]));
        img.put_pixel(1, 0, Rgb([0.0, 0.0, 0.0]));

        let out = sanitize_image(&DynamicImage::ImageRgb32F(img)).unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(out.get_pixel(1, 0), &Rgb([0, 0, 0]));

        let again = sanitize_image(&DynamicImage::ImageRgb8(out.clone())).unwrap();
        assert_eq!(again, out);
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let result = sanitize_bytes(b"definitely not an image");
        assert!(matches!(result, Err(ImagingError::Decode(_))));
    }
}
