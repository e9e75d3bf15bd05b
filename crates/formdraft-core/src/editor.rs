//! The editor: one canvas model plus everything that acts on it.
//!
//! User input arrives as [`Action`]s. Each gesture runs its handlers in
//! order; handlers may queue follow-up work (reflow after a commit, insertion
//! at the cursor) which runs first-in first-out once the handlers are done,
//! so an insertion queued alongside a blur commit sees the committed and
//! reflowed state. A gesture that changes content records one undo step.

use crate::canvas::{Canvas, CanvasState, ConfigEdit, FocusLookup, RenderedContent, Side};
use crate::config::CanvasConfig;
use crate::convert::DocumentConverter;
use crate::cursor::{CursorTracker, Formatting, InsertPayload};
use crate::drag::{self, DragSession, DragSource};
use crate::elements::{CellRef, ContentPosition, ElementId, ElementKind, RichText};
use crate::error::{CanvasError, CanvasResult, ImportWarning};
use crate::history::History;
use crate::markup;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A user action, as delivered by the host or read from a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Start dragging a new element out of the palette.
    BeginPaletteDrag {
        kind: ElementKind,
        #[serde(default)]
        grab_x: f64,
        #[serde(default)]
        grab_y: f64,
    },
    /// Start dragging an element already on the canvas.
    BeginElementDrag { id: ElementId, x: f64, y: f64 },
    /// Finish a drag. Without a session, `payload` names the kind to create.
    Drop {
        x: f64,
        y: f64,
        #[serde(default)]
        payload: Option<String>,
    },
    CancelDrag,
    Select {
        #[serde(default)]
        id: Option<ElementId>,
    },
    Delete { id: ElementId },
    Configure { id: ElementId, edit: ConfigEdit },
    /// Blur or save: reconcile host-rendered content and height.
    Commit {
        id: ElementId,
        #[serde(default)]
        content: Option<RichText>,
        height: f64,
    },
    /// Remember the caret (or selection) in a text element.
    Capture {
        id: ElementId,
        anchor: ContentPosition,
        #[serde(default)]
        focus: Option<ContentPosition>,
    },
    Insert { payload: InsertPayload },
    /// Insert one of the configured placeholder tokens.
    InsertPlaceholder { name: String },
    /// Insert a dropdown with the configured options.
    InsertDropdown,
    Format { formatting: Formatting },
    SelectDropdownOption { id: ElementId, node: usize, option: String },
    SetChecked { id: ElementId, checked: bool },
    SetLabel { id: ElementId, label: String },
    FocusCell { id: ElementId, row: usize, col: usize },
    BlurCell,
    AddRow { id: ElementId },
    AddColumn { id: ElementId },
    EditCell {
        id: ElementId,
        row: usize,
        col: usize,
        content: String,
    },
    DeleteRow { id: ElementId },
    DeleteColumn { id: ElementId },
    InsertRowAbove { id: ElementId },
    InsertRowBelow { id: ElementId },
    InsertColumnLeft { id: ElementId },
    InsertColumnRight { id: ElementId },
    Undo,
    Redo,
    Import { markup: String },
}

/// Severity of a user notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Warning,
    Error,
}

/// Something the host should show the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Work deferred until the current gesture's handlers have run.
#[derive(Debug, Clone, PartialEq)]
enum FollowUp {
    Reflow(ElementId),
    Insert(InsertPayload),
    Format(Formatting),
}

/// The focused table cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellFocus {
    current: Option<(ElementId, CellRef)>,
}

impl CellFocus {
    pub fn get(&self) -> Option<(ElementId, CellRef)> {
        self.current
    }
}

impl FocusLookup for CellFocus {
    fn focused_cell(&self, element: ElementId) -> Option<CellRef> {
        self.current
            .filter(|(focused, _)| *focused == element)
            .map(|(_, cell)| cell)
    }
}

/// Owns the store, history, cursor and drag state of one canvas.
#[derive(Debug, Clone)]
pub struct Editor {
    canvas: Canvas,
    history: History,
    cursor: CursorTracker,
    drag: Option<DragSession>,
    focus: CellFocus,
    queue: VecDeque<FollowUp>,
    notices: Vec<Notice>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

impl Editor {
    pub fn new(config: CanvasConfig) -> Self {
        let history = History::new(config.history_limit);
        Self {
            canvas: Canvas::new(config),
            history,
            cursor: CursorTracker::new(),
            drag: None,
            focus: CellFocus::default(),
            queue: VecDeque::new(),
            notices: Vec::new(),
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn state(&self) -> &CanvasState {
        self.canvas.state()
    }

    pub fn cursor(&self) -> &CursorTracker {
        &self.cursor
    }

    pub fn drag(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    pub fn focus(&self) -> &CellFocus {
        &self.focus
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Notices raised since the last call, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Handle a single action as its own gesture.
    pub fn dispatch(&mut self, action: Action) {
        self.dispatch_gesture([action]);
    }

    /// Handle several actions delivered together, then run their follow-ups.
    pub fn dispatch_gesture(&mut self, actions: impl IntoIterator<Item = Action>) {
        let mut before = self.canvas.state().clone();
        for action in actions {
            match action {
                Action::Undo | Action::Redo => {
                    self.settle(before);
                    if action == Action::Undo {
                        self.undo();
                    } else {
                        self.redo();
                    }
                    before = self.canvas.state().clone();
                }
                action => {
                    if let Err(e) = self.handle(action) {
                        self.report(e);
                    }
                }
            }
        }
        self.settle(before);
    }

    /// Run pending follow-ups and record an undo step if content changed.
    fn settle(&mut self, before: CanvasState) {
        while let Some(task) = self.queue.pop_front() {
            if let Err(e) = self.run_follow_up(task) {
                self.report(e);
            }
        }
        if !self.canvas.state().same_content(&before) {
            self.history.push(before);
        }
    }

    fn run_follow_up(&mut self, task: FollowUp) -> CanvasResult<()> {
        match task {
            FollowUp::Reflow(id) => {
                if self.canvas.index_of(id).is_none() {
                    log::debug!("Skipping reflow of removed element {}", id);
                    return Ok(());
                }
                self.canvas.reflow_from(id)
            }
            FollowUp::Insert(payload) => {
                let caret = self.cursor.insert(&mut self.canvas, payload)?;
                log::debug!("Inserted at {}:{}", caret.node, caret.offset);
                Ok(())
            }
            FollowUp::Format(formatting) => self.cursor.format(&mut self.canvas, &formatting),
        }
    }

    fn report(&mut self, error: CanvasError) {
        log::warn!("{}", error);
        let level = match error {
            CanvasError::StaleReference(_) => NoticeLevel::Warning,
            _ => NoticeLevel::Error,
        };
        self.notices.push(Notice {
            level,
            message: error.to_string(),
        });
    }

    fn warn(&mut self, message: String) {
        log::warn!("{}", message);
        self.notices.push(Notice {
            level: NoticeLevel::Warning,
            message,
        });
    }

    fn handle(&mut self, action: Action) -> CanvasResult<()> {
        match action {
            Action::BeginPaletteDrag { kind, grab_x, grab_y } => {
                self.drag = Some(DragSession::palette(kind, Vec2::new(grab_x, grab_y)));
            }
            Action::BeginElementDrag { id, x, y } => {
                self.drag = Some(DragSession::element(&self.canvas, id, Point::new(x, y))?);
            }
            Action::Drop { x, y, payload } => self.finish_drag(Point::new(x, y), payload.as_deref())?,
            Action::CancelDrag => self.drag = None,
            Action::Select { id } => {
                // Selection never fails a gesture.
                if let Err(e) = self.canvas.select(id) {
                    self.warn(e.to_string());
                }
            }
            Action::Delete { id } => {
                self.canvas.delete_element(id)?;
                if self.focus.get().is_some_and(|(focused, _)| focused == id) {
                    self.focus = CellFocus::default();
                }
            }
            Action::Configure { id, edit } => self.canvas.apply_config(id, edit)?,
            Action::Commit { id, content, height } => {
                let changed = self.canvas.commit(id, RenderedContent { content, height })?;
                log::debug!("Commit of {} (changed: {})", id, changed);
                self.queue.push_back(FollowUp::Reflow(id));
            }
            Action::Capture { id, anchor, focus } => {
                self.cursor
                    .capture(&self.canvas, id, anchor, focus.unwrap_or(anchor))?;
            }
            Action::Insert { payload } => self.queue.push_back(FollowUp::Insert(payload)),
            Action::InsertPlaceholder { name } => {
                if !self.canvas.config().placeholders.contains(&name) {
                    return Err(CanvasError::invalid(format!("'{name}' is not a configured placeholder")));
                }
                self.queue.push_back(FollowUp::Insert(InsertPayload::Token(name)));
            }
            Action::InsertDropdown => {
                let options = self.canvas.config().dropdown_options.clone();
                self.queue
                    .push_back(FollowUp::Insert(InsertPayload::Dropdown(options)));
            }
            Action::Format { formatting } => self.queue.push_back(FollowUp::Format(formatting)),
            Action::SelectDropdownOption { id, node, option } => {
                self.canvas.select_dropdown_option(id, node, &option)?
            }
            Action::SetChecked { id, checked } => self.canvas.set_checked(id, checked)?,
            Action::SetLabel { id, label } => self.canvas.set_label(id, label)?,
            Action::FocusCell { id, row, col } => {
                let cell = CellRef::new(row, col);
                let grid = self
                    .canvas
                    .element(id)
                    .ok_or(CanvasError::ElementNotFound(id))?
                    .table()
                    .ok_or_else(|| CanvasError::invalid(format!("element {id} is not a table")))?;
                if grid.cell(cell).is_none() {
                    return Err(CanvasError::invalid(format!("cell ({row}, {col}) is outside table {id}")));
                }
                self.focus.current = Some((id, cell));
            }
            Action::BlurCell => self.focus = CellFocus::default(),
            Action::AddRow { id } => self.canvas.add_row(id)?,
            Action::AddColumn { id } => self.canvas.add_column(id)?,
            Action::EditCell { id, row, col, content } => {
                self.canvas.edit_cell(id, CellRef::new(row, col), content)?
            }
            Action::DeleteRow { id } => {
                self.canvas.delete_row(id, &self.focus)?;
                self.refocus(id);
            }
            Action::DeleteColumn { id } => {
                self.canvas.delete_column(id, &self.focus)?;
                self.refocus(id);
            }
            Action::InsertRowAbove { id } => {
                self.canvas.insert_row(id, Side::Before, &self.focus)?;
                // The focused cell moved down with its row.
                if let Some((focused, cell)) = self.focus.current {
                    self.focus.current = Some((focused, CellRef::new(cell.row + 1, cell.col)));
                }
            }
            Action::InsertRowBelow { id } => self.canvas.insert_row(id, Side::After, &self.focus)?,
            Action::InsertColumnLeft { id } => {
                self.canvas.insert_column(id, Side::Before, &self.focus)?;
                if let Some((focused, cell)) = self.focus.current {
                    self.focus.current = Some((focused, CellRef::new(cell.row, cell.col + 1)));
                }
            }
            Action::InsertColumnRight { id } => {
                self.canvas.insert_column(id, Side::After, &self.focus)?
            }
            Action::Undo => {
                self.undo();
            }
            Action::Redo => {
                self.redo();
            }
            Action::Import { markup } => {
                self.load_markup(&markup);
            }
        }
        Ok(())
    }

    fn finish_drag(&mut self, point: Point, payload: Option<&str>) -> CanvasResult<()> {
        match self.drag.take() {
            Some(session) => match session.source {
                DragSource::Palette(kind) => {
                    self.canvas.create_element(kind, point, session.grab_offset);
                }
                DragSource::Element(id) => {
                    self.canvas.relocate_element(id, session.target_origin(point))?;
                }
            },
            None => match payload.and_then(drag::parse_payload) {
                Some(kind) => {
                    self.canvas.create_element(kind, point, Vec2::ZERO);
                }
                None => log::warn!("Ignoring drop with payload {:?}", payload),
            },
        }
        Ok(())
    }

    /// Keep the focused cell inside a table that just shrank.
    fn refocus(&mut self, id: ElementId) {
        let Some((focused, cell)) = self.focus.current else {
            return;
        };
        let Some(grid) = self.canvas.element(id).and_then(|e| e.table()) else {
            return;
        };
        if focused == id {
            self.focus.current = Some((
                id,
                CellRef::new(cell.row.min(grid.rows() - 1), cell.col.min(grid.cols() - 1)),
            ));
        }
    }

    /// Step back one undo state. Returns false if there was none.
    pub fn undo(&mut self) -> bool {
        match self.history.undo(self.canvas.state().clone()) {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    /// Re-apply an undone state. Returns false if there was none.
    pub fn redo(&mut self) -> bool {
        match self.history.redo(self.canvas.state().clone()) {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    fn restore(&mut self, snapshot: CanvasState) {
        self.canvas.restore(snapshot);
        self.drag = None;
        match self.focus.get() {
            Some((id, _)) if self.canvas.element(id).and_then(|e| e.table()).is_some() => self.refocus(id),
            Some(_) => self.focus = CellFocus::default(),
            None => {}
        }
    }

    /// Current state as markup.
    pub fn export_markup(&self) -> String {
        markup::serialize(self.canvas.state())
    }

    /// Replace the canvas with imported markup as one undoable step.
    pub fn import_markup(&mut self, markup: &str) -> Vec<ImportWarning> {
        let before = self.canvas.state().clone();
        let warnings = self.load_markup(markup);
        self.settle(before);
        warnings
    }

    /// Convert a binary document and import the result. A failed conversion
    /// leaves the canvas untouched.
    pub fn import_document(
        &mut self,
        converter: &dyn DocumentConverter,
        document: &[u8],
    ) -> CanvasResult<Vec<ImportWarning>> {
        let markup = converter.convert(document).map_err(|e| match e {
            CanvasError::Conversion(_) => e,
            other => CanvasError::Conversion(other.to_string()),
        })?;
        Ok(self.import_markup(&markup))
    }

    fn load_markup(&mut self, markup: &str) -> Vec<ImportWarning> {
        let outcome = markup::parse(markup);
        self.canvas.replace_elements(outcome.elements);
        self.cursor.clear();
        self.focus = CellFocus::default();
        self.drag = None;
        for warning in &outcome.warnings {
            self.warn(warning.to_string());
        }
        outcome.warnings
    }
}
