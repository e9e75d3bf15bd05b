//! Drag sessions: what is being dragged and where it was grabbed.

use crate::canvas::Canvas;
use crate::elements::{ElementId, ElementKind};
use crate::error::{CanvasError, CanvasResult};
use kurbo::{Point, Vec2};

/// Source of an in-progress drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragSource {
    /// A new element being dragged from the palette.
    Palette(ElementKind),
    /// An element already on the canvas.
    Element(ElementId),
}

/// An in-progress drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub source: DragSource,
    /// Pointer position relative to the dragged element's top-left corner.
    pub grab_offset: Vec2,
}

impl DragSession {
    pub fn palette(kind: ElementKind, grab_offset: Vec2) -> Self {
        Self {
            source: DragSource::Palette(kind),
            grab_offset,
        }
    }

    /// Start dragging an existing element picked up at `pointer`.
    pub fn element(canvas: &Canvas, id: ElementId, pointer: Point) -> CanvasResult<Self> {
        let element = canvas.element(id).ok_or(CanvasError::ElementNotFound(id))?;
        Ok(Self {
            source: DragSource::Element(id),
            grab_offset: pointer - element.origin,
        })
    }

    /// Top-left corner the dragged element would have if dropped at `pointer`.
    pub fn target_origin(&self, pointer: Point) -> Point {
        pointer - self.grab_offset
    }
}

/// Read the type tag of a drop payload.
pub fn parse_payload(tag: &str) -> Option<ElementKind> {
    tag.parse().ok()
}
