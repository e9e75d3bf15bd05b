//! Cursor capture and insertion at a remembered caret.
//!
//! The tracker remembers a selection as positions into one element's content
//! tree, stamped with that content's revision. Any replacement of the content
//! by someone else changes the revision, which makes the reference stale
//! instead of silently pointing at the wrong place.

use crate::canvas::Canvas;
use crate::elements::{
    ContentPosition, ContentRange, Dropdown, ElementId, Inline, Marks, SerializableColor,
};
use crate::error::{CanvasError, CanvasResult};
use serde::{Deserialize, Serialize};

/// What to insert at the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum InsertPayload {
    /// Placeholder token, rendered `{{name}}`.
    Token(String),
    /// Dropdown control with these options.
    Dropdown(Vec<String>),
    /// Inline checkbox control.
    Checkbox,
    /// Plain unformatted text.
    Text(String),
}

impl InsertPayload {
    fn into_inline(self) -> CanvasResult<Inline> {
        match self {
            InsertPayload::Token(name) => {
                let name = name.trim();
                if name.is_empty() || name.contains(['{', '}']) {
                    return Err(CanvasError::invalid(format!("'{name}' is not a valid placeholder name")));
                }
                Ok(Inline::token(name))
            }
            InsertPayload::Dropdown(options) => {
                if options.is_empty() {
                    return Err(CanvasError::invalid("a dropdown needs at least one option"));
                }
                Ok(Inline::Dropdown(Dropdown::new(options)))
            }
            InsertPayload::Checkbox => Ok(Inline::Checkbox { checked: false }),
            InsertPayload::Text(text) => Ok(Inline::span(text)),
        }
    }
}

/// A formatting change applied to a selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mark", content = "value", rename_all = "snake_case")]
pub enum Formatting {
    Bold(bool),
    Italic(bool),
    Underline(bool),
    Color(Option<SerializableColor>),
    FontSize(Option<u32>),
}

impl Formatting {
    fn apply(&self, marks: &mut Marks) {
        match self {
            Formatting::Bold(on) => marks.bold = *on,
            Formatting::Italic(on) => marks.italic = *on,
            Formatting::Underline(on) => marks.underline = *on,
            Formatting::Color(color) => marks.color = *color,
            Formatting::FontSize(size) => marks.font_size = *size,
        }
    }
}

/// A remembered selection inside one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorReference {
    pub element: ElementId,
    /// Content revision the positions were taken against.
    pub revision: u64,
    pub anchor: ContentPosition,
    pub focus: ContentPosition,
}

impl CursorReference {
    pub fn range(&self) -> ContentRange {
        ContentRange::new(self.anchor, self.focus)
    }
}

/// Holds at most one cursor reference.
#[derive(Debug, Clone, Default)]
pub struct CursorTracker {
    current: Option<CursorReference>,
}

impl CursorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reference(&self) -> Option<&CursorReference> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Remember a selection in `element`.
    pub fn capture(
        &mut self,
        canvas: &Canvas,
        element: ElementId,
        anchor: ContentPosition,
        focus: ContentPosition,
    ) -> CanvasResult<CursorReference> {
        let target = canvas.element(element).ok_or(CanvasError::ElementNotFound(element))?;
        let text = target
            .text()
            .ok_or_else(|| CanvasError::invalid(format!("cannot place a cursor in {} element {}", target.kind(), element)))?;
        for position in [anchor, focus] {
            if !text.content.contains(position) {
                return Err(CanvasError::invalid(format!(
                    "position {}:{} is outside the content of element {}",
                    position.node, position.offset, element
                )));
            }
        }
        let reference = CursorReference {
            element,
            revision: target.revision(),
            anchor,
            focus,
        };
        self.current = Some(reference);
        Ok(reference)
    }

    /// The current reference, checked against the store.
    pub fn resolve(&self, canvas: &Canvas) -> CanvasResult<CursorReference> {
        let reference = self
            .current
            .ok_or_else(|| CanvasError::invalid("no cursor has been captured"))?;
        let element = canvas
            .element(reference.element)
            .ok_or_else(|| CanvasError::stale(format!("element {} no longer exists", reference.element)))?;
        if element.revision() != reference.revision {
            return Err(CanvasError::stale(format!(
                "content of element {} changed since the cursor was captured",
                reference.element
            )));
        }
        Ok(reference)
    }

    /// Replace the remembered selection with `payload` and move the cursor
    /// just past it.
    pub fn insert(&mut self, canvas: &mut Canvas, payload: InsertPayload) -> CanvasResult<ContentPosition> {
        let reference = self.resolve(canvas)?;
        let inline = payload.into_inline()?;
        let (caret, revision) =
            canvas.replace_text_range(reference.element, reference.revision, reference.range(), inline)?;
        self.current = Some(CursorReference {
            element: reference.element,
            revision,
            anchor: caret,
            focus: caret,
        });
        Ok(caret)
    }

    /// Format the remembered selection. A collapsed selection is left alone.
    pub fn format(&mut self, canvas: &mut Canvas, formatting: &Formatting) -> CanvasResult<()> {
        let reference = self.resolve(canvas)?;
        let range = reference.range();
        if range.is_collapsed() {
            return Ok(());
        }
        let (start, end) = match canvas.element(reference.element).and_then(|e| e.text()) {
            Some(text) => (text.content.to_flat(range.start), text.content.to_flat(range.end)),
            None => (None, None),
        };
        let (Some(start), Some(end)) = (start, end) else {
            return Err(CanvasError::stale("cursor positions no longer resolve"));
        };

        let revision =
            canvas.format_text_range(reference.element, reference.revision, range, |marks| formatting.apply(marks))?;

        // Spans may have split or merged; keep the same absolute offsets.
        if let Some(text) = canvas.element(reference.element).and_then(|e| e.text()) {
            self.current = Some(CursorReference {
                element: reference.element,
                revision,
                anchor: text.content.from_flat(start),
                focus: text.content.from_flat(end),
            });
        }
        Ok(())
    }
}
