//! Element definitions for the canvas.

mod color;
mod table;
mod text;

pub use color::SerializableColor;
pub use table::{CellRef, TableGrid, DEFAULT_CELL};
pub use text::{ContentPosition, ContentRange, Dropdown, Inline, Marks, RichText};
pub(crate) use text::split_tokens;

use crate::config::CanvasConfig;
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique, creation-ordered element identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kinds of block a user can place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Text,
    Checkbox,
    Table,
}

impl ElementKind {
    /// Tag used in drag payloads and exported markup.
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Text => "text",
            ElementKind::Checkbox => "checkbox",
            ElementKind::Table => "table",
        }
    }

    /// Default size for a freshly dropped element of this kind.
    pub fn default_size(&self, config: &CanvasConfig) -> Size {
        match self {
            ElementKind::Text => Size::new(config.text_width, 50.0),
            ElementKind::Checkbox => Size::new(20.0, 20.0),
            ElementKind::Table => Size::new(200.0, 71.0),
        }
    }
}

impl FromStr for ElementKind {
    type Err = String;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(ElementKind::Text),
            "checkbox" => Ok(ElementKind::Checkbox),
            "table" => Ok(ElementKind::Table),
            other => Err(format!("unknown element kind '{other}'")),
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Horizontal alignment of a text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl TextAlign {
    pub fn as_css(&self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
            TextAlign::Justify => "justify",
        }
    }

    pub fn from_css(value: &str) -> Option<Self> {
        match value.trim() {
            "left" | "start" => Some(TextAlign::Left),
            "center" => Some(TextAlign::Center),
            "right" | "end" => Some(TextAlign::Right),
            "justify" => Some(TextAlign::Justify),
            _ => None,
        }
    }
}

/// Box styling shared by all element kinds.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementStyle {
    /// Background fill (None = transparent).
    pub background_color: Option<SerializableColor>,
    /// Outer margin in pixels.
    pub margin: f64,
    /// Inner padding in pixels.
    pub padding: f64,
}

/// Text block contents.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextBody {
    pub content: RichText,
    #[serde(default)]
    pub align: TextAlign,
}

/// A checkbox with a trailing label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckboxBody {
    pub checked: bool,
    pub label: String,
}

impl Default for CheckboxBody {
    fn default() -> Self {
        Self {
            checked: false,
            label: "Label".to_string(),
        }
    }
}

/// Kind-specific element data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ElementBody {
    Text(TextBody),
    Checkbox(CheckboxBody),
    Table(TableGrid),
}

impl ElementBody {
    /// Default body for a new element of `kind`.
    pub fn default_for(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Text => ElementBody::Text(TextBody {
                content: RichText::plain("Edit me"),
                align: TextAlign::Left,
            }),
            ElementKind::Checkbox => ElementBody::Checkbox(CheckboxBody::default()),
            ElementKind::Table => ElementBody::Table(TableGrid::default()),
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            ElementBody::Text(_) => ElementKind::Text,
            ElementBody::Checkbox(_) => ElementKind::Checkbox,
            ElementBody::Table(_) => ElementKind::Table,
        }
    }
}

/// One placed content block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub(crate) id: ElementId,
    /// Top-left corner in canvas coordinates.
    pub origin: Point,
    /// Width and height in pixels.
    pub size: Size,
    pub style: ElementStyle,
    pub body: ElementBody,
    /// Stamp of the last structural content replacement.
    #[serde(default)]
    pub(crate) revision: u64,
}

impl Element {
    /// Create an element of `kind` with its default size and body.
    pub fn new(id: ElementId, kind: ElementKind, origin: Point, config: &CanvasConfig) -> Self {
        Self {
            id,
            origin,
            size: kind.default_size(config),
            style: ElementStyle::default(),
            body: ElementBody::default_for(kind),
            revision: 0,
        }
    }

    /// Create an element from an explicit body.
    pub fn with_body(id: ElementId, origin: Point, size: Size, body: ElementBody) -> Self {
        Self {
            id,
            origin,
            size,
            style: ElementStyle::default(),
            body,
            revision: 0,
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn kind(&self) -> ElementKind {
        self.body.kind()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Bounding box in canvas coordinates.
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.origin, self.size)
    }

    /// y of the bottom edge.
    pub fn bottom(&self) -> f64 {
        self.origin.y + self.size.height
    }

    pub fn text(&self) -> Option<&TextBody> {
        match &self.body {
            ElementBody::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn text_mut(&mut self) -> Option<&mut TextBody> {
        match &mut self.body {
            ElementBody::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn checkbox(&self) -> Option<&CheckboxBody> {
        match &self.body {
            ElementBody::Checkbox(checkbox) => Some(checkbox),
            _ => None,
        }
    }

    pub fn checkbox_mut(&mut self) -> Option<&mut CheckboxBody> {
        match &mut self.body {
            ElementBody::Checkbox(checkbox) => Some(checkbox),
            _ => None,
        }
    }

    pub fn table(&self) -> Option<&TableGrid> {
        match &self.body {
            ElementBody::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn table_mut(&mut self) -> Option<&mut TableGrid> {
        match &mut self.body {
            ElementBody::Table(table) => Some(table),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_defaults() {
        let config = CanvasConfig::default();
        let text = Element::new(ElementId(1), ElementKind::Text, Point::ZERO, &config);
        assert_eq!(text.size, Size::new(500.0, 50.0));
        assert_eq!(text.text().unwrap().content.plain_text(), "Edit me");

        let checkbox = Element::new(ElementId(2), ElementKind::Checkbox, Point::ZERO, &config);
        assert_eq!(checkbox.size, Size::new(20.0, 20.0));
        assert_eq!(checkbox.checkbox().unwrap().label, "Label");

        let table = Element::new(ElementId(3), ElementKind::Table, Point::ZERO, &config);
        assert_eq!(table.size, Size::new(200.0, 71.0));
        let grid = table.table().unwrap();
        assert_eq!((grid.rows(), grid.cols()), (2, 2));
    }

    #[test]
    fn test_text_width_follows_config() {
        let config = CanvasConfig {
            text_width: 100.0,
            ..CanvasConfig::default()
        };
        let text = Element::new(ElementId(1), ElementKind::Text, Point::ZERO, &config);
        assert_eq!(text.size.width, 100.0);
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!("table".parse::<ElementKind>(), Ok(ElementKind::Table));
        assert_eq!(" Checkbox ".parse::<ElementKind>(), Ok(ElementKind::Checkbox));
        assert!("image".parse::<ElementKind>().is_err());
        assert_eq!(ElementKind::Text.to_string(), "text");
    }

    #[test]
    fn test_bounds() {
        let config = CanvasConfig::default();
        let table = Element::new(ElementId(1), ElementKind::Table, Point::new(40.0, 30.0), &config);
        assert_eq!(table.bottom(), 101.0);
        assert_eq!(table.bounds(), Rect::new(40.0, 30.0, 240.0, 101.0));
    }
}
