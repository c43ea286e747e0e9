//! Edit sessions
//!
//! - `region`: detected text regions and style inference
//! - `history`: bounded per-page undo/redo
//! - `editor`: all interactions on one uploaded document
//! - `manager`: the set of open sessions

mod editor;
mod history;
mod manager;
mod region;

pub use editor::{
    CanvasDrawing, CanvasObject, CanvasRect, CommitRequest, EditPanel, EditSession, EditorError, EditorSettings,
    Selection, SessionSummary, Thumbnail,
};
pub use history::{PageHistory, DEFAULT_HISTORY_LIMIT};
pub use manager::{SessionError, SessionManager, SharedSession};
pub use region::{infer_font_size, infer_stroke_width, BoundingBox, Region};
