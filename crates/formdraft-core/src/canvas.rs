//! Element store, placement and content synchronisation.

use crate::config::{CanvasConfig, PlacementMode};
use crate::elements::{
    CellRef, CheckboxBody, ContentPosition, ContentRange, Element, ElementId, ElementKind, Inline,
    Marks, RichText, SerializableColor, TableGrid, TextAlign,
};
use crate::error::{CanvasError, CanvasResult};
use crate::reflow;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Everything undo/redo restores.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CanvasState {
    /// Placed elements in vertical flow order.
    pub elements: Vec<Arc<Element>>,
    /// Currently selected element.
    pub selected: Option<ElementId>,
    /// Scrollable height of the canvas.
    pub canvas_height: f64,
}

impl CanvasState {
    /// Whether two states differ in anything but selection.
    pub fn same_content(&self, other: &CanvasState) -> bool {
        self.canvas_height == other.canvas_height
            && self.elements.len() == other.elements.len()
            && self
                .elements
                .iter()
                .zip(&other.elements)
                .all(|(a, b)| Arc::ptr_eq(a, b) || a == b)
    }
}

/// An edit from the configuration panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum ConfigEdit {
    Width(f64),
    Height(f64),
    Background(Option<SerializableColor>),
    Margin(f64),
    Padding(f64),
    Align(TextAlign),
}

/// Content and measured height reported by the host for one element.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RenderedContent {
    /// New rich text, for Text elements. None keeps the stored content.
    #[serde(default)]
    pub content: Option<RichText>,
    pub height: f64,
}

/// Resolves which table cell currently has focus.
pub trait FocusLookup {
    fn focused_cell(&self, element: ElementId) -> Option<CellRef>;
}

/// Where a table row or column is inserted relative to the focused cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Before,
    After,
}

/// The element store.
#[derive(Debug, Clone)]
pub struct Canvas {
    config: CanvasConfig,
    state: CanvasState,
    next_id: u64,
    next_revision: u64,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

impl Canvas {
    /// Create an empty canvas.
    pub fn new(config: CanvasConfig) -> Self {
        let canvas_height = config.minimum_height;
        Self {
            config,
            state: CanvasState {
                canvas_height,
                ..CanvasState::default()
            },
            next_id: 1,
            next_revision: 1,
        }
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn state(&self) -> &CanvasState {
        &self.state
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.state.elements.iter().map(|e| e.as_ref())
    }

    pub fn len(&self) -> usize {
        self.state.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.elements.is_empty()
    }

    pub fn canvas_height(&self) -> f64 {
        self.state.canvas_height
    }

    pub fn selected(&self) -> Option<ElementId> {
        self.state.selected
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.index_of(id).map(|i| self.state.elements[i].as_ref())
    }

    /// Position of `id` in flow order.
    pub fn index_of(&self, id: ElementId) -> Option<usize> {
        self.state.elements.iter().position(|e| e.id == id)
    }

    fn require(&self, id: ElementId) -> CanvasResult<usize> {
        self.index_of(id).ok_or(CanvasError::ElementNotFound(id))
    }

    fn allocate_id(&mut self) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        id
    }

    fn allocate_revision(&mut self) -> u64 {
        let revision = self.next_revision;
        self.next_revision += 1;
        revision
    }

    /// Replace the whole state, as undo/redo do. Counters keep running so
    /// ids and revisions are never reused.
    pub fn restore(&mut self, state: CanvasState) {
        self.state = state;
    }

    /// Recompute the canvas height from the current elements.
    pub fn recompute_extent(&mut self) {
        self.state.canvas_height = reflow::canvas_height(&self.state.elements, &self.config);
    }

    /// Create an element dropped at `drop`, grabbed `grab_offset` away from
    /// its top-left corner.
    pub fn create_element(&mut self, kind: ElementKind, drop: Point, grab_offset: Vec2) -> ElementId {
        let id = self.allocate_id();
        let mut element = Element::new(id, kind, drop - grab_offset, &self.config);
        element.revision = self.allocate_revision();

        if element.origin.y < self.config.top_insert_threshold {
            let shift = element.size.height + self.config.spacing;
            for existing in &mut self.state.elements {
                Arc::make_mut(existing).origin.y += shift;
            }
            element.origin.y = self.config.spacing;
            self.state.elements.insert(0, Arc::new(element));
        } else {
            self.state.elements.push(Arc::new(element));
        }

        self.recompute_extent();
        log::debug!("Created {} element {}", kind, id);
        id
    }

    /// Move an existing element so its top-left corner lands on `origin`.
    pub fn relocate_element(&mut self, id: ElementId, origin: Point) -> CanvasResult<Point> {
        let index = self.require(id)?;
        let size = self.state.elements[index].size;
        let origin = match self.config.placement {
            PlacementMode::Clamped => Point::new(
                origin.x.min(self.config.canvas_width - size.width).max(0.0),
                origin.y.min(self.state.canvas_height - size.height).max(0.0),
            ),
            PlacementMode::Free => origin,
        };
        Arc::make_mut(&mut self.state.elements[index]).origin = origin;
        self.recompute_extent();
        Ok(origin)
    }

    /// Remove one element. The others keep their positions.
    pub fn delete_element(&mut self, id: ElementId) -> CanvasResult<Element> {
        let index = self.require(id)?;
        let removed = self.state.elements.remove(index);
        if self.state.selected == Some(id) {
            self.state.selected = None;
        }
        self.recompute_extent();
        log::debug!("Deleted element {}", id);
        Ok(Arc::unwrap_or_clone(removed))
    }

    pub fn select(&mut self, id: Option<ElementId>) -> CanvasResult<()> {
        if let Some(id) = id {
            self.require(id)?;
        }
        self.state.selected = id;
        Ok(())
    }

    /// Apply a configuration panel edit. Moves nothing else.
    pub fn apply_config(&mut self, id: ElementId, edit: ConfigEdit) -> CanvasResult<()> {
        let index = self.require(id)?;
        let check = |name: &str, value: f64| -> CanvasResult<f64> {
            if value.is_finite() && value >= 0.0 {
                Ok(value)
            } else {
                Err(CanvasError::invalid(format!("{name} must be a non-negative number, got {value}")))
            }
        };
        if let ConfigEdit::Align(_) = edit {
            if self.state.elements[index].kind() != ElementKind::Text {
                return Err(CanvasError::invalid("alignment only applies to text elements"));
            }
        }

        let element = Arc::make_mut(&mut self.state.elements[index]);
        match edit {
            ConfigEdit::Width(width) => element.size.width = check("width", width)?,
            ConfigEdit::Height(height) => element.size.height = check("height", height)?,
            ConfigEdit::Background(color) => element.style.background_color = color,
            ConfigEdit::Margin(margin) => element.style.margin = check("margin", margin)?,
            ConfigEdit::Padding(padding) => element.style.padding = check("padding", padding)?,
            ConfigEdit::Align(align) => {
                if let Some(text) = element.text_mut() {
                    text.align = align;
                }
            }
        }
        self.recompute_extent();
        Ok(())
    }

    /// Write host-rendered content and height into the store.
    ///
    /// Does not reflow; call [`Canvas::reflow_from`] afterwards. Returns
    /// whether anything changed.
    pub fn commit(&mut self, id: ElementId, rendered: RenderedContent) -> CanvasResult<bool> {
        let index = self.require(id)?;
        if !rendered.height.is_finite() || rendered.height < 0.0 {
            return Err(CanvasError::invalid(format!(
                "measured height must be a non-negative number, got {}",
                rendered.height
            )));
        }
        let current = &self.state.elements[index];
        let content_changed = match (&rendered.content, current.text()) {
            (Some(_), None) => {
                return Err(CanvasError::invalid(format!(
                    "{} element {} has no rich text content",
                    current.kind(),
                    id
                )));
            }
            (Some(content), Some(text)) => *content != text.content,
            (None, _) => false,
        };
        let height_changed = current.size.height != rendered.height;
        if !content_changed && !height_changed {
            return Ok(false);
        }

        let revision = content_changed.then(|| self.allocate_revision());
        let element = Arc::make_mut(&mut self.state.elements[index]);
        element.size.height = rendered.height;
        if let Some(revision) = revision {
            element.revision = revision;
            if let (Some(content), Some(text)) = (rendered.content, element.text_mut()) {
                text.content = content;
            }
        }
        Ok(true)
    }

    /// Cascade positions below `id` and recompute the extent.
    pub fn reflow_from(&mut self, id: ElementId) -> CanvasResult<()> {
        let index = self.require(id)?;
        let moved = reflow::cascade_from(&mut self.state.elements, index, self.config.spacing);
        self.recompute_extent();
        log::debug!("Reflow from {} moved {} elements", id, moved);
        Ok(())
    }

    /// Replace `range` in a text element with `inline`.
    ///
    /// `revision` must match the element's current revision. Returns the
    /// caret after the inserted node and the element's new revision.
    pub fn replace_text_range(
        &mut self,
        id: ElementId,
        revision: u64,
        range: ContentRange,
        inline: Inline,
    ) -> CanvasResult<(ContentPosition, u64)> {
        let index = self.text_index(id, revision)?;
        let mut content = self.text_content(index)?.clone();
        let caret = content.replace_range(range, inline)?;
        let revision = self.store_content(index, content);
        Ok((caret, revision))
    }

    /// Apply a formatting change to `range` in a text element.
    pub fn format_text_range(
        &mut self,
        id: ElementId,
        revision: u64,
        range: ContentRange,
        update: impl Fn(&mut Marks),
    ) -> CanvasResult<u64> {
        let index = self.text_index(id, revision)?;
        let mut content = self.text_content(index)?.clone();
        content.apply_marks(range, update)?;
        Ok(self.store_content(index, content))
    }

    fn text_index(&self, id: ElementId, revision: u64) -> CanvasResult<usize> {
        let index = self
            .index_of(id)
            .ok_or_else(|| CanvasError::stale(format!("element {id} no longer exists")))?;
        if self.state.elements[index].revision != revision {
            return Err(CanvasError::stale(format!("content of element {id} was replaced")));
        }
        Ok(index)
    }

    fn text_content(&self, index: usize) -> CanvasResult<&RichText> {
        let element = &self.state.elements[index];
        element
            .text()
            .map(|t| &t.content)
            .ok_or_else(|| CanvasError::invalid(format!("{} element {} has no rich text", element.kind(), element.id)))
    }

    fn store_content(&mut self, index: usize, content: RichText) -> u64 {
        let revision = self.allocate_revision();
        let element = Arc::make_mut(&mut self.state.elements[index]);
        if let Some(text) = element.text_mut() {
            text.content = content;
        }
        element.revision = revision;
        revision
    }

    /// Record the chosen option of the dropdown at node `node`.
    pub fn select_dropdown_option(&mut self, id: ElementId, node: usize, option: &str) -> CanvasResult<()> {
        let index = self.require(id)?;
        let mut content = self.text_content(index)?.clone();
        content.dropdown_mut(node)?.select(option)?;
        let element = Arc::make_mut(&mut self.state.elements[index]);
        if let Some(text) = element.text_mut() {
            text.content = content;
        }
        Ok(())
    }

    pub fn set_checked(&mut self, id: ElementId, checked: bool) -> CanvasResult<()> {
        self.edit_checkbox(id, |checkbox| checkbox.checked = checked)
    }

    pub fn set_label(&mut self, id: ElementId, label: impl Into<String>) -> CanvasResult<()> {
        let label = label.into();
        self.edit_checkbox(id, |checkbox| checkbox.label = label)
    }

    fn edit_checkbox(
        &mut self,
        id: ElementId,
        edit: impl FnOnce(&mut CheckboxBody),
    ) -> CanvasResult<()> {
        let index = self.require(id)?;
        if self.state.elements[index].checkbox().is_none() {
            return Err(CanvasError::invalid(format!("element {id} is not a checkbox")));
        }
        if let Some(checkbox) = Arc::make_mut(&mut self.state.elements[index]).checkbox_mut() {
            edit(checkbox);
        }
        Ok(())
    }

    /// Run `edit` on a copy of a table's grid and store it only on success.
    fn edit_table(
        &mut self,
        id: ElementId,
        edit: impl FnOnce(&mut TableGrid) -> CanvasResult<()>,
    ) -> CanvasResult<()> {
        let index = self.require(id)?;
        let mut grid = self.state.elements[index]
            .table()
            .cloned()
            .ok_or_else(|| CanvasError::invalid(format!("element {id} is not a table")))?;
        edit(&mut grid)?;
        if let Some(table) = Arc::make_mut(&mut self.state.elements[index]).table_mut() {
            *table = grid;
        }
        Ok(())
    }

    fn focused(id: ElementId, focus: &dyn FocusLookup) -> CanvasResult<CellRef> {
        focus
            .focused_cell(id)
            .ok_or_else(|| CanvasError::invalid(format!("no focused cell in table {id}")))
    }

    pub fn add_row(&mut self, id: ElementId) -> CanvasResult<()> {
        self.edit_table(id, |grid| {
            grid.add_row();
            Ok(())
        })
    }

    pub fn add_column(&mut self, id: ElementId) -> CanvasResult<()> {
        self.edit_table(id, |grid| {
            grid.add_column();
            Ok(())
        })
    }

    pub fn edit_cell(&mut self, id: ElementId, at: CellRef, content: impl Into<String>) -> CanvasResult<()> {
        let content = content.into();
        self.edit_table(id, |grid| grid.edit_cell(at, content))
    }

    /// Delete the row containing the focused cell.
    pub fn delete_row(&mut self, id: ElementId, focus: &dyn FocusLookup) -> CanvasResult<()> {
        let cell = Self::focused(id, focus)?;
        self.edit_table(id, |grid| grid.delete_row(cell.row))
    }

    /// Delete the column containing the focused cell.
    pub fn delete_column(&mut self, id: ElementId, focus: &dyn FocusLookup) -> CanvasResult<()> {
        let cell = Self::focused(id, focus)?;
        self.edit_table(id, |grid| grid.delete_column(cell.col))
    }

    /// Insert a row above or below the focused cell.
    pub fn insert_row(&mut self, id: ElementId, side: Side, focus: &dyn FocusLookup) -> CanvasResult<()> {
        let cell = Self::focused(id, focus)?;
        self.edit_table(id, |grid| {
            if cell.row >= grid.rows() {
                return Err(CanvasError::invalid(format!("focused row {} is outside the table", cell.row)));
            }
            grid.insert_row(match side {
                Side::Before => cell.row,
                Side::After => cell.row + 1,
            })
        })
    }

    /// Insert a column left or right of the focused cell.
    pub fn insert_column(&mut self, id: ElementId, side: Side, focus: &dyn FocusLookup) -> CanvasResult<()> {
        let cell = Self::focused(id, focus)?;
        self.edit_table(id, |grid| {
            if cell.col >= grid.cols() {
                return Err(CanvasError::invalid(format!("focused column {} is outside the table", cell.col)));
            }
            grid.insert_column(match side {
                Side::Before => cell.col,
                Side::After => cell.col + 1,
            })
        })
    }

    /// Replace every element with imported ones, assigning fresh ids.
    pub fn replace_elements(&mut self, elements: Vec<Element>) {
        let mut placed = Vec::with_capacity(elements.len());
        for mut element in elements {
            element.id = self.allocate_id();
            element.revision = self.allocate_revision();
            placed.push(Arc::new(element));
        }
        self.state.elements = placed;
        self.state.selected = None;
        self.recompute_extent();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Focus(Option<CellRef>);

    impl FocusLookup for Focus {
        fn focused_cell(&self, _element: ElementId) -> Option<CellRef> {
            self.0
        }
    }

    fn canvas() -> Canvas {
        Canvas::default()
    }

    #[test]
    fn test_create_below_threshold_appends() {
        let mut canvas = canvas();
        let id = canvas.create_element(ElementKind::Table, Point::new(50.0, 110.0), Vec2::new(10.0, 10.0));
        let table = canvas.element(id).unwrap();
        assert_eq!(table.origin, Point::new(40.0, 100.0));
        assert_eq!(canvas.canvas_height(), 500.0);
    }

    #[test]
    fn test_top_insert_shifts_existing() {
        let mut canvas = canvas();
        let first = canvas.create_element(ElementKind::Text, Point::new(0.0, 100.0), Vec2::ZERO);
        let second = canvas.create_element(ElementKind::Checkbox, Point::new(5.0, 20.0), Vec2::ZERO);
        assert_eq!(canvas.index_of(second), Some(0));
        assert_eq!(canvas.element(second).unwrap().origin, Point::new(5.0, 10.0));
        // Shifted by the new element's height plus spacing.
        assert_eq!(canvas.element(first).unwrap().origin.y, 130.0);
    }

    #[test]
    fn test_ids_are_creation_ordered() {
        let mut canvas = canvas();
        let a = canvas.create_element(ElementKind::Text, Point::new(0.0, 100.0), Vec2::ZERO);
        let b = canvas.create_element(ElementKind::Text, Point::new(0.0, 200.0), Vec2::ZERO);
        assert!(a < b);
    }

    #[test]
    fn test_relocate_clamps() {
        let mut canvas = canvas();
        let id = canvas.create_element(ElementKind::Table, Point::new(0.0, 100.0), Vec2::ZERO);
        let origin = canvas.relocate_element(id, Point::new(750.0, -20.0)).unwrap();
        assert_eq!(origin, Point::new(600.0, 0.0));
        let origin = canvas.relocate_element(id, Point::new(10.0, 480.0)).unwrap();
        assert_eq!(origin, Point::new(10.0, 429.0));
    }

    #[test]
    fn test_relocate_free_mode() {
        let config = CanvasConfig {
            placement: PlacementMode::Free,
            ..CanvasConfig::default()
        };
        let mut canvas = Canvas::new(config);
        let id = canvas.create_element(ElementKind::Table, Point::new(0.0, 100.0), Vec2::ZERO);
        let origin = canvas.relocate_element(id, Point::new(750.0, 900.0)).unwrap();
        assert_eq!(origin, Point::new(750.0, 900.0));
        assert_eq!(canvas.canvas_height(), 1021.0);
    }

    #[test]
    fn test_delete_keeps_positions() {
        let mut canvas = canvas();
        let a = canvas.create_element(ElementKind::Text, Point::new(0.0, 100.0), Vec2::ZERO);
        let b = canvas.create_element(ElementKind::Text, Point::new(0.0, 300.0), Vec2::ZERO);
        canvas.select(Some(a)).unwrap();
        canvas.delete_element(a).unwrap();
        assert_eq!(canvas.selected(), None);
        assert_eq!(canvas.element(b).unwrap().origin.y, 300.0);
        assert!(matches!(canvas.delete_element(a), Err(CanvasError::ElementNotFound(_))));
    }

    #[test]
    fn test_commit_and_reflow() {
        let mut canvas = canvas();
        let a = canvas.create_element(ElementKind::Text, Point::new(0.0, 60.0), Vec2::ZERO);
        let b = canvas.create_element(ElementKind::Text, Point::new(0.0, 120.0), Vec2::ZERO);
        let rendered = RenderedContent {
            content: Some(RichText::plain("Longer text")),
            height: 90.0,
        };
        assert!(canvas.commit(a, rendered.clone()).unwrap());
        canvas.reflow_from(a).unwrap();
        assert_eq!(canvas.element(b).unwrap().origin.y, 160.0);

        let revision = canvas.element(a).unwrap().revision();
        assert!(!canvas.commit(a, rendered).unwrap());
        assert_eq!(canvas.element(a).unwrap().revision(), revision);
    }

    #[test]
    fn test_commit_rejects_content_for_checkbox() {
        let mut canvas = canvas();
        let id = canvas.create_element(ElementKind::Checkbox, Point::new(0.0, 60.0), Vec2::ZERO);
        let result = canvas.commit(
            id,
            RenderedContent {
                content: Some(RichText::plain("x")),
                height: 20.0,
            },
        );
        assert!(matches!(result, Err(CanvasError::InvalidOperation(_))));
    }

    #[test]
    fn test_apply_config_validates() {
        let mut canvas = canvas();
        let id = canvas.create_element(ElementKind::Checkbox, Point::new(0.0, 60.0), Vec2::ZERO);
        canvas.apply_config(id, ConfigEdit::Height(600.0)).unwrap();
        assert_eq!(canvas.canvas_height(), 710.0);
        assert!(canvas.apply_config(id, ConfigEdit::Width(-1.0)).is_err());
        assert!(canvas.apply_config(id, ConfigEdit::Align(TextAlign::Center)).is_err());
        canvas
            .apply_config(id, ConfigEdit::Background(Some(SerializableColor::white())))
            .unwrap();
        assert_eq!(
            canvas.element(id).unwrap().style.background_color,
            Some(SerializableColor::white())
        );
    }

    #[test]
    fn test_table_ops_use_focus() {
        let mut canvas = canvas();
        let id = canvas.create_element(ElementKind::Table, Point::new(40.0, 100.0), Vec2::ZERO);
        assert!(canvas.delete_row(id, &Focus(None)).is_err());

        canvas.insert_row(id, Side::After, &Focus(Some(CellRef::new(0, 0)))).unwrap();
        canvas.insert_column(id, Side::Before, &Focus(Some(CellRef::new(0, 0)))).unwrap();
        let grid = canvas.element(id).unwrap().table().unwrap();
        assert_eq!((grid.rows(), grid.cols()), (3, 3));

        canvas.delete_column(id, &Focus(Some(CellRef::new(0, 2)))).unwrap();
        let grid = canvas.element(id).unwrap().table().unwrap();
        assert_eq!((grid.rows(), grid.cols()), (3, 2));
        assert!(canvas.insert_row(id, Side::Before, &Focus(Some(CellRef::new(9, 0)))).is_err());
    }

    #[test]
    fn test_failed_table_edit_leaves_store() {
        let mut canvas = canvas();
        let id = canvas.create_element(ElementKind::Table, Point::new(40.0, 100.0), Vec2::ZERO);
        let before = canvas.state().clone();
        assert!(canvas.edit_cell(id, CellRef::new(5, 5), "x").is_err());
        assert!(canvas.state().same_content(&before));
    }

    #[test]
    fn test_stale_revision_rejected() {
        let mut canvas = canvas();
        let id = canvas.create_element(ElementKind::Text, Point::new(0.0, 100.0), Vec2::ZERO);
        let revision = canvas.element(id).unwrap().revision();
        let range = ContentRange::collapsed(ContentPosition::new(0, 4));
        let (caret, new_revision) = canvas
            .replace_text_range(id, revision, range, Inline::token("Date"))
            .unwrap();
        assert_eq!(caret, ContentPosition::new(1, 1));
        assert_ne!(new_revision, revision);
        assert!(matches!(
            canvas.replace_text_range(id, revision, range, Inline::token("Date")),
            Err(CanvasError::StaleReference(_))
        ));
    }
}
