//! Text regions
//!
//! A region is one detected text line on a page, carrying its current and
//! detection-time boxes plus the style used when it is redrawn.

use serde::{Deserialize, Serialize};

use crate::ocr::TextDetection;

/// Smallest inferred font size in pixels
pub const MIN_FONT_SIZE: u32 = 10;

/// Font size as a fraction of box height
const FONT_HEIGHT_RATIO: f64 = 0.9;

/// Default text color for new regions
pub const DEFAULT_COLOR: &str = "#000000";

/// Axis-aligned box in page pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl BoundingBox {
    pub fn new(x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self { x0, top, x1, bottom }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Same size, top-left corner moved to `(x, y)`
    pub fn moved_to(&self, x: f64, y: f64) -> Self {
        Self::new(x, y, x + self.width(), y + self.height())
    }

    /// Whether any edge differs from `other` by more than `tolerance`
    pub fn differs_from(&self, other: &BoundingBox, tolerance: f64) -> bool {
        (self.x0 - other.x0).abs() > tolerance
            || (self.top - other.top).abs() > tolerance
            || (self.x1 - other.x1).abs() > tolerance
            || (self.bottom - other.bottom).abs() > tolerance
    }
}

/// A text region on a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    /// Current box, moved by canvas drags and commits
    pub bbox: BoundingBox,
    /// Box at detection time; commits erase this area
    pub original: BoundingBox,
    pub text: String,
    pub font_size: u32,
    pub stroke_width: u32,
    /// `#rrggbb`
    pub color: String,
}

impl Region {
    /// Build a region from an OCR detection.
    ///
    /// The box is the min/max of the polygon corners truncated to whole
    /// pixels. Returns `None` for a detection without corners.
    pub fn from_detection(detection: &TextDetection) -> Option<Self> {
        let first = detection.polygon.first()?;
        let (mut x0, mut top, mut x1, mut bottom) = (first.x, first.y, first.x, first.y);
        for point in &detection.polygon[1..] {
            x0 = x0.min(point.x);
            top = top.min(point.y);
            x1 = x1.max(point.x);
            bottom = bottom.max(point.y);
        }

        let bbox = BoundingBox::new(x0.trunc(), top.trunc(), x1.trunc(), bottom.trunc());
        let font_size = infer_font_size(bbox.height());

        Some(Self {
            bbox,
            original: bbox,
            text: detection.text.clone(),
            font_size,
            stroke_width: infer_stroke_width(font_size),
            color: DEFAULT_COLOR.to_string(),
        })
    }

    /// Re-derive font size and stroke width from the current box height
    pub fn recompute_style(&mut self) {
        self.font_size = infer_font_size(self.bbox.height());
        self.stroke_width = infer_stroke_width(self.font_size);
    }
}

/// `max(10, floor(0.9 * height))`
pub fn infer_font_size(height: f64) -> u32 {
    let size = (height * FONT_HEIGHT_RATIO).floor();
    if size.is_finite() && size > MIN_FONT_SIZE as f64 {
        size as u32
    } else {
        MIN_FONT_SIZE
    }
}

/// Outline thickness for large text: above 80 px → 3, above 50 px → 2
pub fn infer_stroke_width(font_size: u32) -> u32 {
    if font_size > 80 {
        3
    } else if font_size > 50 {
        2
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::Point;

    #[test]
    fn test_font_size_inference() {
        assert_eq!(infer_font_size(100.0), 90);
        assert_eq!(infer_font_size(11.0), 10);
        assert_eq!(infer_font_size(0.0), 10);
        assert_eq!(infer_font_size(-5.0), 10);
        assert_eq!(infer_font_size(57.0), 51);
    }

    #[test]
    fn test_stroke_tiers() {
        assert_eq!(infer_stroke_width(10), 0);
        assert_eq!(infer_stroke_width(50), 0);
        assert_eq!(infer_stroke_width(51), 2);
        assert_eq!(infer_stroke_width(80), 2);
        assert_eq!(infer_stroke_width(81), 3);
        assert_eq!(infer_stroke_width(90), 3);
    }

    #[test]
    fn test_region_from_skewed_polygon() {
        let detection = TextDetection {
            polygon: vec![
                Point::new(12.7, 20.2),
                Point::new(110.9, 18.6),
                Point::new(111.4, 118.9),
                Point::new(13.1, 120.5),
            ],
            text: "標題".to_string(),
            confidence: 0.95,
        };

        let region = Region::from_detection(&detection).unwrap();

        assert_eq!(region.bbox, BoundingBox::new(12.0, 18.0, 111.0, 120.0));
        assert_eq!(region.original, region.bbox);
        assert_eq!(region.font_size, 91);
        assert_eq!(region.stroke_width, 3);
        assert_eq!(region.color, DEFAULT_COLOR);
        assert_eq!(region.text, "標題");
    }

    #[test]
    fn test_region_without_polygon() {
        let detection = TextDetection {
            polygon: vec![],
            text: "x".to_string(),
            confidence: 1.0,
        };
        assert!(Region::from_detection(&detection).is_none());
    }

    #[test]
    fn test_recompute_uses_current_box() {
        let detection = TextDetection::from_rect(0.0, 0.0, 100.0, 20.0, "a", 1.0);
        let mut region = Region::from_detection(&detection).unwrap();
        assert_eq!(region.font_size, 18);

        region.bbox = BoundingBox::new(0.0, 0.0, 100.0, 60.0);
        region.recompute_style();

        assert_eq!(region.font_size, 54);
        assert_eq!(region.stroke_width, 2);
        assert_eq!(region.original.height(), 20.0);
    }

    #[test]
    fn test_box_tolerance() {
        let a = BoundingBox::new(10.0, 10.0, 50.0, 30.0);
        assert!(!a.differs_from(&BoundingBox::new(10.9, 9.5, 50.0, 31.0), 1.0));
        assert!(a.differs_from(&BoundingBox::new(10.0, 10.0, 51.5, 30.0), 1.0));
        assert_eq!(a.moved_to(0.0, 5.0), BoundingBox::new(0.0, 5.0, 40.0, 25.0));
    }
}
