//! Edit session state
//!
//! One `EditSession` per uploaded document. It holds every edited page as
//! encoded PNG bytes, the detected regions, per-page undo/redo history and
//! the selection state a front end needs to drive its canvas. All methods
//! are blocking; the HTTP layer calls them from `spawn_blocking`.

use std::collections::HashMap;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use image::{imageops::FilterType, RgbImage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::history::{PageHistory, DEFAULT_HISTORY_LIMIT};
use super::region::{BoundingBox, Region};
use crate::imaging::{self, FontBook, ImagingError, TextStyle};
use crate::ocr::TextDetection;
use crate::pdf::{PageRasterizer, RenderError};

/// Overlay format version understood by the canvas widget
pub const CANVAS_VERSION: &str = "4.4.0";

const SELECTED_STROKE: &str = "rgba(255, 0, 0, 0.9)";
const UNSELECTED_STROKE: &str = "rgba(0, 113, 227, 0.6)";
const TRANSPARENT: &str = "rgba(0, 0, 0, 0)";

/// Edges moving less than this many page pixels are ignored
const SYNC_TOLERANCE: f64 = 1.0;

pub const MIN_COMMIT_FONT_SIZE: u32 = 10;
pub const MAX_COMMIT_FONT_SIZE: u32 = 500;
pub const MAX_STROKE_WIDTH: u32 = 5;

/// Editor errors
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("Region {index} not found on page {page}")]
    RegionNotFound { page: usize, index: usize },

    #[error("Page {page} is not the active page (current page is {current})")]
    PageNotActive { page: usize, current: usize },

    #[error("Page {0} has not been analyzed")]
    NotAnalyzed(usize),

    #[error("Font size {0} out of range ({MIN_COMMIT_FONT_SIZE}-{MAX_COMMIT_FONT_SIZE})")]
    InvalidFontSize(u32),

    #[error("Stroke width {0} out of range (0-{MAX_STROKE_WIDTH})")]
    InvalidStrokeWidth(u32),

    #[error(transparent)]
    Imaging(#[from] ImagingError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl EditorError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::RegionNotFound { .. } => StatusCode::NOT_FOUND,
            Self::PageNotActive { .. } | Self::NotAnalyzed(_) => StatusCode::CONFLICT,
            Self::InvalidFontSize(_) | Self::InvalidStrokeWidth(_) => StatusCode::BAD_REQUEST,
            Self::Imaging(e) => e.status_code(),
            Self::Render(e) => e.status_code(),
        }
    }
}

/// Resolution and history settings shared by all sessions
#[derive(Debug, Clone, Copy)]
pub struct EditorSettings {
    /// Resolution of edited and exported pages
    pub render_dpi: f32,
    /// Resolution of navigation thumbnails
    pub thumbnail_dpi: f32,
    /// Width of the canvas overlay in display pixels
    pub display_width: u32,
    /// Undo steps kept per page
    pub history_limit: usize,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            render_dpi: 150.0,
            thumbnail_dpi: 40.0,
            display_width: 800,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// What the user is looking at
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub current_page: usize,
    pub selected_index: Option<usize>,
    /// Text in the edit box, not yet committed
    pub editing_text: String,
    /// Bumped whenever clients must rebuild their canvas
    pub canvas_key: u64,
}

/// One overlay rectangle
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasObject {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub fill: &'static str,
    pub stroke: &'static str,
    pub stroke_width: u32,
    pub index: usize,
}

/// Initial drawing for the canvas widget
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasDrawing {
    pub version: &'static str,
    pub objects: Vec<CanvasObject>,
    pub width: u32,
    pub height: u32,
    pub canvas_key: u64,
}

fn one() -> f64 {
    1.0
}

/// Rectangle geometry reported back by the canvas widget, in display pixels
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default = "one")]
    pub scale_x: f64,
    #[serde(default = "one")]
    pub scale_y: f64,
}

/// Values for the edit form
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditPanel {
    pub page: usize,
    pub selected_index: Option<usize>,
    pub region: Option<Region>,
    pub editing_text: String,
    pub can_undo: bool,
    pub can_redo: bool,
    pub canvas_key: u64,
}

fn default_color() -> String {
    super::region::DEFAULT_COLOR.to_string()
}

/// An edit to apply to one region
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font_size: u32,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub stroke_width: u32,
    #[serde(default)]
    pub bold: bool,
}

/// Navigation strip entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Thumbnail {
    pub page: usize,
    pub width: u32,
    pub height: u32,
    pub edited: bool,
    /// Base64 PNG
    pub data: String,
}

/// Session overview
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    pub file_name: String,
    pub page_count: usize,
    pub edited_pages: Vec<usize>,
    pub analyzed_pages: Vec<usize>,
    pub selection: Selection,
    pub created_at: DateTime<Utc>,
}

/// State of one document being retouched
pub struct EditSession {
    id: Uuid,
    file_name: String,
    source: Arc<dyn PageRasterizer>,
    settings: EditorSettings,
    /// Edited pages as PNG bytes
    pages: HashMap<usize, Vec<u8>>,
    history: HashMap<usize, PageHistory>,
    regions: HashMap<usize, Vec<Region>>,
    selection: Selection,
    created_at: DateTime<Utc>,
}

impl EditSession {
    pub fn new(id: Uuid, file_name: impl Into<String>, source: Arc<dyn PageRasterizer>, settings: EditorSettings) -> Self {
        Self {
            id,
            file_name: file_name.into(),
            source,
            settings,
            pages: HashMap::new(),
            history: HashMap::new(),
            regions: HashMap::new(),
            selection: Selection::default(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn page_count(&self) -> usize {
        self.source.page_count()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn is_edited(&self, page: usize) -> bool {
        self.pages.contains_key(&page)
    }

    pub fn summary(&self) -> SessionSummary {
        let mut edited_pages: Vec<usize> = self.pages.keys().copied().collect();
        edited_pages.sort_unstable();
        let mut analyzed_pages: Vec<usize> = self.regions.keys().copied().collect();
        analyzed_pages.sort_unstable();

        SessionSummary {
            id: self.id,
            file_name: self.file_name.clone(),
            page_count: self.page_count(),
            edited_pages,
            analyzed_pages,
            selection: self.selection.clone(),
            created_at: self.created_at,
        }
    }

    // ========================================================================
    // Page bitmaps
    // ========================================================================

    /// Untouched page, rendered and sanitized
    fn render_clean(&self, page: usize) -> Result<RgbImage, EditorError> {
        let raw = self.source.render_page(page, self.settings.render_dpi)?;
        Ok(imaging::sanitize_image(&raw)?)
    }

    /// Current page bitmap: the edited version if any, else a fresh render
    pub fn page_image(&self, page: usize) -> Result<RgbImage, EditorError> {
        self.source.check_page(page)?;
        match self.pages.get(&page) {
            Some(bytes) => Ok(imaging::sanitize_bytes(bytes)?),
            None => self.render_clean(page),
        }
    }

    /// Current page as PNG bytes
    pub fn page_png(&self, page: usize) -> Result<Vec<u8>, EditorError> {
        self.source.check_page(page)?;
        match self.pages.get(&page) {
            Some(bytes) => Ok(bytes.clone()),
            None => Ok(imaging::encode_png(&self.render_clean(page)?)?),
        }
    }

    /// Every page in order, for export
    pub fn export_images(&self) -> Result<Vec<Vec<u8>>, EditorError> {
        (0..self.page_count()).map(|page| self.page_png(page)).collect()
    }

    /// Low-resolution previews of every page
    pub fn thumbnails(&self) -> Result<Vec<Thumbnail>, EditorError> {
        let ratio = self.settings.thumbnail_dpi / self.settings.render_dpi;
        let mut thumbnails = Vec::with_capacity(self.page_count());

        for page in 0..self.page_count() {
            let image = match self.pages.get(&page) {
                Some(bytes) => {
                    let full = imaging::sanitize_bytes(bytes)?;
                    let width = ((full.width() as f32 * ratio).round() as u32).max(1);
                    let height = ((full.height() as f32 * ratio).round() as u32).max(1);
                    image::imageops::resize(&full, width, height, FilterType::Triangle)
                }
                None => {
                    let raw = self.source.render_page(page, self.settings.thumbnail_dpi)?;
                    imaging::sanitize_image(&raw)?
                }
            };

            thumbnails.push(Thumbnail {
                page,
                width: image.width(),
                height: image.height(),
                edited: self.is_edited(page),
                data: BASE64.encode(imaging::encode_png(&image)?),
            });
        }

        Ok(thumbnails)
    }

    // ========================================================================
    // Navigation and regions
    // ========================================================================

    /// Make `page` the active page
    pub fn navigate(&mut self, page: usize) -> Result<&Selection, EditorError> {
        self.source.check_page(page)?;
        self.selection.current_page = page;
        self.selection.selected_index = Some(0);
        self.selection.editing_text.clear();
        self.selection.canvas_key += 1;
        tracing::debug!(session_id = %self.id, page, "Navigated");
        Ok(&self.selection)
    }

    /// Replace the regions of `page` with freshly detected ones
    pub fn apply_detections(&mut self, page: usize, detections: &[TextDetection]) -> Result<&[Region], EditorError> {
        self.source.check_page(page)?;

        let regions: Vec<Region> = detections.iter().filter_map(Region::from_detection).collect();
        tracing::info!(session_id = %self.id, page, regions = regions.len(), "Regions detected");

        if page == self.selection.current_page {
            self.selection.selected_index = if regions.is_empty() { None } else { Some(0) };
            self.selection.editing_text.clear();
        }
        self.selection.canvas_key += 1;

        let stored = self.regions.entry(page).or_default();
        *stored = regions;
        Ok(stored.as_slice())
    }

    /// Regions of `page`; empty when the page has not been analyzed
    pub fn regions(&self, page: usize) -> Result<&[Region], EditorError> {
        self.source.check_page(page)?;
        Ok(self.regions.get(&page).map(Vec::as_slice).unwrap_or(&[]))
    }

    fn analyzed_regions(&self, page: usize) -> Result<&Vec<Region>, EditorError> {
        self.source.check_page(page)?;
        self.regions.get(&page).ok_or(EditorError::NotAnalyzed(page))
    }

    fn require_active(&self, page: usize) -> Result<(), EditorError> {
        self.source.check_page(page)?;
        if page != self.selection.current_page {
            return Err(EditorError::PageNotActive {
                page,
                current: self.selection.current_page,
            });
        }
        Ok(())
    }

    /// Display pixels per page pixel for `page`
    fn display_scale(&self, page: usize) -> Result<(f64, u32), EditorError> {
        let image = self.page_image(page)?;
        let scale = self.settings.display_width as f64 / image.width().max(1) as f64;
        let height = (image.height() as f64 * scale) as u32;
        Ok((scale, height))
    }

    /// Overlay rectangles for the canvas widget
    pub fn canvas(&self, page: usize) -> Result<CanvasDrawing, EditorError> {
        let (scale, height) = self.display_scale(page)?;
        let selected = if page == self.selection.current_page {
            self.selection.selected_index
        } else {
            None
        };

        let objects = self
            .regions(page)?
            .iter()
            .enumerate()
            .map(|(index, region)| {
                let is_selected = selected == Some(index);
                CanvasObject {
                    kind: "rect",
                    left: region.bbox.x0 * scale,
                    top: region.bbox.top * scale,
                    width: region.bbox.width() * scale,
                    height: region.bbox.height() * scale,
                    fill: TRANSPARENT,
                    stroke: if is_selected { SELECTED_STROKE } else { UNSELECTED_STROKE },
                    stroke_width: if is_selected { 3 } else { 1 },
                    index,
                }
            })
            .collect();

        Ok(CanvasDrawing {
            version: CANVAS_VERSION,
            objects,
            width: self.settings.display_width,
            height,
            canvas_key: self.selection.canvas_key,
        })
    }

    /// Apply geometry reported by the canvas widget.
    ///
    /// Ignored unless there is exactly one rect per region. A region whose
    /// box moved by more than one pixel takes the new box and becomes the
    /// selected region. Returns whether any region changed.
    pub fn sync_canvas(&mut self, page: usize, rects: &[CanvasRect]) -> Result<bool, EditorError> {
        self.require_active(page)?;
        let count = self.analyzed_regions(page)?.len();
        if rects.len() != count {
            tracing::debug!(page, rects = rects.len(), regions = count, "Ignoring canvas sync with mismatched objects");
            return Ok(false);
        }

        let (scale, _) = self.display_scale(page)?;
        let mut changed = false;

        for (index, rect) in rects.iter().enumerate() {
            let updated = BoundingBox::new(
                rect.left / scale,
                rect.top / scale,
                (rect.left + rect.width * rect.scale_x) / scale,
                (rect.top + rect.height * rect.scale_y) / scale,
            );

            let Some(region) = self.regions.get_mut(&page).and_then(|r| r.get_mut(index)) else {
                continue;
            };
            if !updated.differs_from(&region.bbox, SYNC_TOLERANCE) {
                continue;
            }

            region.bbox = updated;
            changed = true;

            if self.selection.selected_index != Some(index) {
                self.selection.selected_index = Some(index);
                self.selection.editing_text = region.text.clone();
            }
        }

        Ok(changed)
    }

    /// Select a region by index. Returns whether the selection changed.
    pub fn select_region(&mut self, page: usize, index: usize) -> Result<bool, EditorError> {
        self.require_active(page)?;
        let region = self
            .analyzed_regions(page)?
            .get(index)
            .ok_or(EditorError::RegionNotFound { page, index })?;

        if self.selection.selected_index == Some(index) {
            return Ok(false);
        }

        self.selection.editing_text = region.text.clone();
        self.selection.selected_index = Some(index);
        self.selection.canvas_key += 1;
        Ok(true)
    }

    /// Edit form state for the active page
    pub fn edit_panel(&mut self, page: usize) -> Result<EditPanel, EditorError> {
        self.require_active(page)?;

        let history = self.history.get(&page);
        let mut panel = EditPanel {
            page,
            selected_index: None,
            region: None,
            editing_text: String::new(),
            can_undo: history.is_some_and(PageHistory::can_undo),
            can_redo: history.is_some_and(PageHistory::can_redo),
            canvas_key: self.selection.canvas_key,
        };

        let regions = match self.regions.get(&page) {
            Some(regions) if !regions.is_empty() => regions,
            _ => return Ok(panel),
        };

        let index = match self.selection.selected_index {
            Some(index) if index < regions.len() => index,
            _ => 0,
        };
        self.selection.selected_index = Some(index);

        let region = &regions[index];
        if self.selection.editing_text.is_empty() {
            self.selection.editing_text = region.text.clone();
        }

        panel.selected_index = Some(index);
        panel.region = Some(region.clone());
        panel.editing_text = self.selection.editing_text.clone();
        Ok(panel)
    }

    /// Re-derive font size and stroke width of every region on `page`
    pub fn recompute_fonts(&mut self, page: usize) -> Result<&[Region], EditorError> {
        self.source.check_page(page)?;
        let regions = self.regions.get_mut(&page).ok_or(EditorError::NotAnalyzed(page))?;
        for region in regions.iter_mut() {
            region.recompute_style();
        }
        Ok(regions.as_slice())
    }

    // ========================================================================
    // Editing
    // ========================================================================

    /// Erase a region's original box and draw replacement text.
    ///
    /// The page state before the edit goes onto the undo stack.
    pub fn commit(&mut self, page: usize, index: usize, request: &CommitRequest, fonts: &FontBook) -> Result<&Region, EditorError> {
        self.require_active(page)?;

        if !(MIN_COMMIT_FONT_SIZE..=MAX_COMMIT_FONT_SIZE).contains(&request.font_size) {
            return Err(EditorError::InvalidFontSize(request.font_size));
        }
        if request.stroke_width > MAX_STROKE_WIDTH {
            return Err(EditorError::InvalidStrokeWidth(request.stroke_width));
        }
        let color = imaging::parse_hex_color(&request.color)?;

        let original = self
            .analyzed_regions(page)?
            .get(index)
            .ok_or(EditorError::RegionNotFound { page, index })?
            .original;

        let before = self.page_png(page)?;
        let mut canvas = imaging::decode_png(&before)?;

        imaging::erase_box(&mut canvas, original.x0, original.top, original.x1, original.bottom);
        let style = TextStyle {
            size: request.font_size as f32,
            color,
            stroke_width: request.stroke_width,
        };
        imaging::draw_text(
            &mut canvas,
            &fonts.face(request.bold),
            &request.text,
            request.x.round() as i32,
            request.y.round() as i32,
            &style,
        );
        let after = imaging::encode_png(&canvas)?;

        let limit = self.settings.history_limit;
        self.history
            .entry(page)
            .or_insert_with(|| PageHistory::new(limit))
            .record(before);
        self.pages.insert(page, after);

        self.selection.selected_index = Some(index);
        self.selection.editing_text = request.text.clone();
        self.selection.canvas_key += 1;

        tracing::info!(session_id = %self.id, page, index, "Region committed");

        let region = self
            .regions
            .get_mut(&page)
            .and_then(|regions| regions.get_mut(index))
            .ok_or(EditorError::RegionNotFound { page, index })?;
        region.bbox = region.bbox.moved_to(request.x, request.y);
        region.text = request.text.clone();
        region.font_size = request.font_size;
        region.stroke_width = request.stroke_width;
        region.color = request.color.trim().to_lowercase();
        Ok(region)
    }

    /// Revert the last commit on `page`. Returns false when there is nothing to undo.
    pub fn undo(&mut self, page: usize) -> Result<bool, EditorError> {
        self.source.check_page(page)?;
        if !self.history.get(&page).is_some_and(PageHistory::can_undo) {
            return Ok(false);
        }

        let current = self.page_png(page)?;
        let Some(previous) = self.history.get_mut(&page).and_then(|h| h.undo(current)) else {
            return Ok(false);
        };
        self.pages.insert(page, previous);
        self.selection.canvas_key += 1;
        tracing::debug!(session_id = %self.id, page, "Undo");
        Ok(true)
    }

    /// Re-apply the last undone commit on `page`. Returns false when there is nothing to redo.
    pub fn redo(&mut self, page: usize) -> Result<bool, EditorError> {
        self.source.check_page(page)?;
        if !self.history.get(&page).is_some_and(PageHistory::can_redo) {
            return Ok(false);
        }

        let current = self.page_png(page)?;
        let Some(next) = self.history.get_mut(&page).and_then(|h| h.redo(current)) else {
            return Ok(false);
        };
        self.pages.insert(page, next);
        self.selection.canvas_key += 1;
        tracing::debug!(session_id = %self.id, page, "Redo");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fake::FakePages;
    use image::Rgb;

    const WIDTH: u32 = 400;
    const HEIGHT: u32 = 300;

    fn session(pages: usize) -> EditSession {
        EditSession::new(
            Uuid::new_v4(),
            "deck.pdf",
            Arc::new(FakePages::new(pages, WIDTH, HEIGHT)),
            EditorSettings::default(),
        )
    }

    fn analyzed(pages: usize) -> EditSession {
        let mut s = session(pages);
        s.apply_detections(
            0,
            &[
                TextDetection::from_rect(20.0, 30.0, 100.0, 40.0, "Title", 0.98),
                TextDetection::from_rect(20.0, 150.0, 200.0, 20.0, "Body", 0.91),
            ],
        )
        .unwrap();
        s
    }

    fn request(text: &str, x: f64, y: f64) -> CommitRequest {
        CommitRequest {
            text: text.to_string(),
            x,
            y,
            font_size: 24,
            color: "#FF0000".to_string(),
            stroke_width: 0,
            bold: false,
        }
    }

    #[test]
    fn test_unedited_page_is_sanitized_render() {
        let s = session(2);
        let image = s.page_image(1).unwrap();

        assert_eq!(image.dimensions(), (WIDTH, HEIGHT));
        assert_eq!(*image.get_pixel(10, 10), Rgb([255, 255, 255]));
        let (x, marker) = FakePages::marker(1);
        assert_eq!(image.get_pixel(x, 0).0[0], marker.0[0]);
    }

    #[test]
    fn test_navigate_resets_selection() {
        let mut s = analyzed(3);
        s.select_region(0, 1).unwrap();
        let key = s.selection().canvas_key;

        let selection = s.navigate(2).unwrap();
        assert_eq!(selection.current_page, 2);
        assert_eq!(selection.selected_index, Some(0));
        assert!(selection.editing_text.is_empty());
        assert_eq!(selection.canvas_key, key + 1);

        assert!(matches!(s.navigate(3), Err(EditorError::Render(RenderError::PageNotFound { .. }))));
    }

    #[test]
    fn test_apply_detections_builds_regions() {
        let s = analyzed(1);
        let regions = s.regions(0).unwrap();

        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].font_size, 36);
        assert_eq!(regions[1].font_size, 18);
        assert_eq!(s.selection().selected_index, Some(0));
        assert_eq!(s.selection().canvas_key, 1);
    }

    #[test]
    fn test_empty_detection_clears_selection() {
        let mut s = session(1);
        s.apply_detections(0, &[]).unwrap();
        assert_eq!(s.selection().selected_index, None);
        assert!(s.regions(0).unwrap().is_empty());

        let panel = s.edit_panel(0).unwrap();
        assert!(panel.region.is_none());
    }

    #[test]
    fn test_canvas_scales_to_display_width() {
        let s = analyzed(1);
        let drawing = s.canvas(0).unwrap();

        assert_eq!(drawing.version, "4.4.0");
        assert_eq!(drawing.width, 800);
        assert_eq!(drawing.height, 600);
        assert_eq!(drawing.objects.len(), 2);

        let first = &drawing.objects[0];
        assert_eq!((first.left, first.top, first.width, first.height), (40.0, 60.0, 200.0, 80.0));
        assert_eq!(first.stroke, SELECTED_STROKE);
        assert_eq!(first.stroke_width, 3);
        assert_eq!(drawing.objects[1].stroke, UNSELECTED_STROKE);
        assert_eq!(drawing.objects[1].stroke_width, 1);
    }

    #[test]
    fn test_sync_canvas_moves_and_selects() {
        let mut s = analyzed(1);
        let mut rects: Vec<CanvasRect> = s
            .canvas(0)
            .unwrap()
            .objects
            .iter()
            .map(|o| CanvasRect {
                left: o.left,
                top: o.top,
                width: o.width,
                height: o.height,
                scale_x: 1.0,
                scale_y: 1.0,
            })
            .collect();

        // Sub-pixel jitter is ignored
        rects[1].left += 1.5;
        assert!(!s.sync_canvas(0, &rects).unwrap());

        rects[1].left += 20.0;
        rects[1].scale_x = 1.5;
        assert!(s.sync_canvas(0, &rects).unwrap());

        let region = &s.regions(0).unwrap()[1];
        assert!((region.bbox.x0 - 30.75).abs() < 1e-9);
        assert!((region.bbox.x1 - 330.75).abs() < 1e-9);
        assert_eq!(region.original.x0, 20.0);
        assert_eq!(s.selection().selected_index, Some(1));
        assert_eq!(s.selection().editing_text, "Body");
    }

    #[test]
    fn test_sync_canvas_ignores_mismatched_count() {
        let mut s = analyzed(1);
        let rect = CanvasRect {
            left: 0.0,
            top: 0.0,
            width: 10.0,
            height: 10.0,
            scale_x: 1.0,
            scale_y: 1.0,
        };
        assert!(!s.sync_canvas(0, &[rect]).unwrap());
        assert_eq!(s.regions(0).unwrap()[0].bbox.x0, 20.0);
    }

    #[test]
    fn test_selection_requires_active_page() {
        let mut s = analyzed(2);
        s.navigate(1).unwrap();

        assert!(matches!(s.select_region(0, 0), Err(EditorError::PageNotActive { page: 0, current: 1 })));
        assert!(matches!(s.select_region(1, 0), Err(EditorError::NotAnalyzed(1))));
    }

    #[test]
    fn test_select_region_loads_text() {
        let mut s = analyzed(1);
        let key = s.selection().canvas_key;

        assert!(s.select_region(0, 1).unwrap());
        assert_eq!(s.selection().editing_text, "Body");
        assert_eq!(s.selection().canvas_key, key + 1);

        assert!(!s.select_region(0, 1).unwrap());
        assert!(matches!(s.select_region(0, 9), Err(EditorError::RegionNotFound { index: 9, .. })));
    }

    #[test]
    fn test_edit_panel_fills_buffer() {
        let mut s = analyzed(1);
        s.selection.selected_index = Some(7);

        let panel = s.edit_panel(0).unwrap();
        assert_eq!(panel.selected_index, Some(0));
        assert_eq!(panel.editing_text, "Title");
        assert!(!panel.can_undo);
        assert!(!panel.can_redo);
    }

    #[test]
    fn test_recompute_fonts() {
        let mut s = analyzed(1);
        s.regions.get_mut(&0).unwrap()[1].bbox.bottom = 270.0;

        let regions = s.recompute_fonts(0).unwrap();
        assert_eq!(regions[1].font_size, 108);
        assert_eq!(regions[1].stroke_width, 3);
        assert_eq!(regions[0].font_size, 36);

        let mut fresh = session(1);
        assert!(matches!(fresh.recompute_fonts(0), Err(EditorError::NotAnalyzed(0))));
    }

    #[test]
    fn test_commit_erases_and_draws() {
        let mut s = analyzed(1);
        let fonts = FontBook::builtin();

        // Ink inside the original box that the commit must remove
        let mut page = s.page_image(0).unwrap();
        page.put_pixel(110, 60, Rgb([0, 0, 0]));
        s.pages.insert(0, imaging::encode_png(&page).unwrap());

        let region = s.commit(0, 0, &request("New", 200.0, 200.0), &fonts).unwrap().clone();

        assert_eq!(region.bbox, BoundingBox::new(200.0, 200.0, 300.0, 240.0));
        assert_eq!(region.original, BoundingBox::new(20.0, 30.0, 120.0, 70.0));
        assert_eq!(region.text, "New");
        assert_eq!(region.color, "#ff0000");
        assert_eq!(s.selection().editing_text, "New");

        let edited = s.page_image(0).unwrap();
        assert_eq!(*edited.get_pixel(110, 60), Rgb([255, 255, 255]));
        let red = edited
            .enumerate_pixels()
            .filter(|(x, y, p)| *x >= 200 && *y >= 200 && **p == Rgb([255, 0, 0]))
            .count();
        assert!(red > 0);
        assert!(s.is_edited(0));
    }

    #[test]
    fn test_commit_validation() {
        let mut s = analyzed(1);
        let fonts = FontBook::builtin();

        let mut bad = request("x", 0.0, 0.0);
        bad.font_size = 9;
        assert!(matches!(s.commit(0, 0, &bad, &fonts), Err(EditorError::InvalidFontSize(9))));

        let mut bad = request("x", 0.0, 0.0);
        bad.stroke_width = 6;
        assert!(matches!(s.commit(0, 0, &bad, &fonts), Err(EditorError::InvalidStrokeWidth(6))));

        let mut bad = request("x", 0.0, 0.0);
        bad.color = "red".to_string();
        assert!(matches!(s.commit(0, 0, &bad, &fonts), Err(EditorError::Imaging(ImagingError::InvalidColor(_)))));

        assert!(!s.is_edited(0));
        assert!(!s.undo(0).unwrap());
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut s = analyzed(1);
        let fonts = FontBook::builtin();
        let pristine = s.page_png(0).unwrap();

        s.commit(0, 0, &request("A", 20.0, 30.0), &fonts).unwrap();
        let after_first = s.page_png(0).unwrap();
        assert_ne!(after_first, pristine);

        assert!(s.undo(0).unwrap());
        assert_eq!(s.page_png(0).unwrap(), pristine);

        assert!(s.redo(0).unwrap());
        assert_eq!(s.page_png(0).unwrap(), after_first);

        assert!(!s.redo(0).unwrap());
        let panel = s.edit_panel(0).unwrap();
        assert!(panel.can_undo);
        assert!(!panel.can_redo);
    }

    #[test]
    fn test_commit_clears_redo() {
        let mut s = analyzed(1);
        let fonts = FontBook::builtin();

        s.commit(0, 0, &request("A", 20.0, 30.0), &fonts).unwrap();
        s.undo(0).unwrap();
        s.commit(0, 1, &request("B", 20.0, 150.0), &fonts).unwrap();

        assert!(!s.redo(0).unwrap());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut s = analyzed(1);
        let fonts = FontBook::builtin();

        for i in 0..12 {
            s.commit(0, 0, &request(&i.to_string(), 20.0, 30.0), &fonts).unwrap();
        }

        let mut undone = 0;
        while s.undo(0).unwrap() {
            undone += 1;
        }
        assert_eq!(undone, 10);
    }

    #[test]
    fn test_history_is_per_page() {
        let mut s = analyzed(2);
        let fonts = FontBook::builtin();
        s.commit(0, 0, &request("A", 20.0, 30.0), &fonts).unwrap();

        assert!(!s.undo(1).unwrap());
        assert!(s.undo(0).unwrap());
    }

    #[test]
    fn test_export_images_in_page_order() {
        let mut s = analyzed(3);
        let fonts = FontBook::builtin();
        s.commit(0, 0, &request("A", 20.0, 30.0), &fonts).unwrap();

        let images = s.export_images().unwrap();
        assert_eq!(images.len(), 3);
        assert_eq!(images[0], s.page_png(0).unwrap());

        for (page, bytes) in images.iter().enumerate().skip(1) {
            let image = imaging::decode_png(bytes).unwrap();
            let (x, marker) = FakePages::marker(page);
            assert_eq!(image.get_pixel(x, 0).0[0], marker.0[0]);
        }
    }

    #[test]
    fn test_thumbnails_flag_edits() {
        let mut s = analyzed(2);
        let fonts = FontBook::builtin();
        s.commit(0, 0, &request("A", 20.0, 30.0), &fonts).unwrap();

        let thumbnails = s.thumbnails().unwrap();
        assert_eq!(thumbnails.len(), 2);
        assert!(thumbnails[0].edited);
        assert!(!thumbnails[1].edited);
        assert_eq!((thumbnails[1].width, thumbnails[1].height), (107, 80));
        assert_eq!((thumbnails[0].width, thumbnails[0].height), (107, 80));
        assert!(!thumbnails[1].data.is_empty());

        let summary = s.summary();
        assert_eq!(summary.edited_pages, vec![0]);
        assert_eq!(summary.analyzed_pages, vec![0]);
    }
}
