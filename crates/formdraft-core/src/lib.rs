//! FormDraft Core Library
//!
//! Platform-agnostic document model for the FormDraft canvas: placed elements,
//! drop placement and vertical reflow, rich text editing at a remembered
//! cursor, table grids, undo/redo and the markup round trip.

pub mod canvas;
pub mod config;
pub mod convert;
pub mod cursor;
pub mod drag;
pub mod editor;
pub mod elements;
pub mod error;
pub mod history;
pub mod markup;
pub mod reflow;

pub use canvas::{Canvas, CanvasState, ConfigEdit, FocusLookup, RenderedContent, Side};
pub use config::{CanvasConfig, PlacementMode};
pub use convert::DocumentConverter;
pub use cursor::{CursorReference, CursorTracker, Formatting, InsertPayload};
pub use drag::{DragSession, DragSource};
pub use editor::{Action, CellFocus, Editor, Notice, NoticeLevel};
pub use elements::{
    CellRef, ContentPosition, ContentRange, Element, ElementBody, ElementId, ElementKind, Inline, Marks,
    RichText, SerializableColor, TableGrid,
};
pub use error::{CanvasError, CanvasResult, ImportWarning};
pub use history::History;
pub use markup::ImportOutcome;
