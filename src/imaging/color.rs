use image::Rgb;

use super::ImagingError;

/// Parse a `#rrggbb` color string
pub fn parse_hex_color(value: &str) -> Result<Rgb<u8>, ImagingError> {
    let hex = value
        .trim()
        .strip_prefix('#')
        .ok_or_else(|| ImagingError::InvalidColor(value.to_string()))?;

    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ImagingError::InvalidColor(value.to_string()));
    }

    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16).map_err(|_| ImagingError::InvalidColor(value.to_string()))
    };

    Ok(Rgb([channel(0..2)?, channel(2..4)?, channel(4..6)?]))
}
