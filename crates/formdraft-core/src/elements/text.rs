//! Rich text content tree for text elements.
//!
//! Content is a flat sequence of inline nodes: formatted spans plus atomic
//! nodes (placeholder tokens, dropdowns, inline checkboxes, line breaks).
//! Positions address a node and an offset inside it; spans count offsets in
//! chars, atomic nodes have length 1 (offset 0 is before, 1 is after).
//!
//! Every edit renormalizes the sequence (empty spans dropped, adjacent spans
//! with equal marks merged), so node indices are only meaningful against the
//! content they were taken from.

use super::SerializableColor;
use crate::error::{CanvasError, CanvasResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("valid token regex"));

/// Formatting applied to a span.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Marks {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    /// Font color.
    #[serde(default)]
    pub color: Option<SerializableColor>,
    /// Font size in pixels.
    #[serde(default)]
    pub font_size: Option<u32>,
}

impl Marks {
    pub fn is_plain(&self) -> bool {
        *self == Marks::default()
    }
}

/// An inline select control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dropdown {
    pub options: Vec<String>,
    /// Index of the option the user picked, recorded when it changes.
    #[serde(default)]
    pub selected: Option<usize>,
}

impl Dropdown {
    pub fn new(options: Vec<String>) -> Self {
        Self {
            options,
            selected: None,
        }
    }

    /// Record `option` as the selected value.
    pub fn select(&mut self, option: &str) -> CanvasResult<()> {
        let index = self
            .options
            .iter()
            .position(|o| o == option)
            .ok_or_else(|| CanvasError::invalid(format!("'{option}' is not a dropdown option")))?;
        self.selected = Some(index);
        Ok(())
    }

    pub fn selected_option(&self) -> Option<&str> {
        self.selected
            .and_then(|i| self.options.get(i))
            .map(String::as_str)
    }
}

/// One node of rich text content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inline {
    /// Run of text sharing the same formatting.
    Span {
        text: String,
        #[serde(default)]
        marks: Marks,
    },
    /// Placeholder rendered as `{{name}}`.
    Token { name: String },
    Dropdown(Dropdown),
    Checkbox {
        #[serde(default)]
        checked: bool,
    },
    LineBreak,
}

impl Inline {
    pub fn span(text: impl Into<String>) -> Self {
        Inline::Span {
            text: text.into(),
            marks: Marks::default(),
        }
    }

    pub fn token(name: impl Into<String>) -> Self {
        Inline::Token { name: name.into() }
    }

    /// Length in cursor offsets.
    pub fn len(&self) -> usize {
        match self {
            Inline::Span { text, .. } => text.chars().count(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_span(&self) -> bool {
        matches!(self, Inline::Span { .. })
    }
}

/// A caret location inside rich text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ContentPosition {
    /// Index of the node the caret is in.
    pub node: usize,
    /// Offset inside that node.
    pub offset: usize,
}

impl ContentPosition {
    pub fn new(node: usize, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A possibly collapsed selection, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRange {
    pub start: ContentPosition,
    pub end: ContentPosition,
}

impl ContentRange {
    /// Build a range from anchor/focus in either order.
    pub fn new(a: ContentPosition, b: ContentPosition) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    pub fn collapsed(at: ContentPosition) -> Self {
        Self { start: at, end: at }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Owned rich text content.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RichText {
    nodes: Vec<Inline>,
}

impl RichText {
    pub fn new(nodes: Vec<Inline>) -> Self {
        let mut text = Self { nodes };
        text.normalize();
        text
    }

    /// Unformatted text. `{{name}}` sequences become tokens.
    pub fn plain(text: &str) -> Self {
        Self::new(split_tokens(text, &Marks::default()))
    }

    pub fn nodes(&self) -> &[Inline] {
        &self.nodes
    }

    /// Total length in cursor offsets.
    pub fn len(&self) -> usize {
        self.nodes.iter().map(Inline::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Text as a user would read it.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Inline::Span { text, .. } => out.push_str(text),
                Inline::Token { name } => {
                    out.push_str("{{");
                    out.push_str(name);
                    out.push_str("}}");
                }
                Inline::Dropdown(dropdown) => {
                    out.push_str(dropdown.selected_option().unwrap_or_default())
                }
                Inline::Checkbox { .. } => {}
                Inline::LineBreak => out.push('\n'),
            }
        }
        out
    }

    /// Position at the very end of the content.
    pub fn end(&self) -> ContentPosition {
        match self.nodes.last() {
            Some(last) => ContentPosition::new(self.nodes.len() - 1, last.len()),
            None => ContentPosition::default(),
        }
    }

    /// Whether `pos` addresses a real location in this content.
    pub fn contains(&self, pos: ContentPosition) -> bool {
        self.to_flat(pos).is_some()
    }

    /// Convert a position into an absolute offset.
    pub fn to_flat(&self, pos: ContentPosition) -> Option<usize> {
        if pos.node == self.nodes.len() {
            return (pos.offset == 0).then(|| self.len());
        }
        let node = self.nodes.get(pos.node)?;
        if pos.offset > node.len() {
            return None;
        }
        let before: usize = self.nodes[..pos.node].iter().map(Inline::len).sum();
        Some(before + pos.offset)
    }

    /// Convert an absolute offset back into a position. Boundaries resolve
    /// to the end of the preceding node.
    pub fn from_flat(&self, flat: usize) -> ContentPosition {
        if flat == 0 || self.nodes.is_empty() {
            return ContentPosition::default();
        }
        let mut remaining = flat;
        for (index, node) in self.nodes.iter().enumerate() {
            let len = node.len();
            if remaining <= len {
                return ContentPosition::new(index, remaining);
            }
            remaining -= len;
        }
        self.end()
    }

    fn flat_range(&self, range: ContentRange) -> CanvasResult<(usize, usize)> {
        let start = self
            .to_flat(range.start)
            .ok_or_else(|| CanvasError::stale(format!("position {:?} is outside the content", range.start)))?;
        let end = self
            .to_flat(range.end)
            .ok_or_else(|| CanvasError::stale(format!("position {:?} is outside the content", range.end)))?;
        Ok((start.min(end), start.max(end)))
    }

    /// Remove the selected range, returning the collapsed caret.
    pub fn delete_range(&mut self, range: ContentRange) -> CanvasResult<ContentPosition> {
        let (start, end) = self.flat_range(range)?;
        self.delete_flat(start, end);
        Ok(self.from_flat(start))
    }

    /// Replace the selected range with `inline`, returning the caret
    /// immediately after the inserted node.
    pub fn replace_range(&mut self, range: ContentRange, inline: Inline) -> CanvasResult<ContentPosition> {
        let (start, end) = self.flat_range(range)?;
        self.delete_flat(start, end);
        let inserted = inline.len();
        self.insert_flat(start, inline);
        Ok(self.from_flat(start + inserted))
    }

    /// Apply `update` to the marks of every span inside `range`.
    pub fn apply_marks(&mut self, range: ContentRange, update: impl Fn(&mut Marks)) -> CanvasResult<()> {
        let (start, end) = self.flat_range(range)?;
        if start == end {
            return Ok(());
        }
        self.split_at(start);
        self.split_at(end);
        let mut offset = 0;
        for node in &mut self.nodes {
            let len = node.len();
            if offset >= start && offset + len <= end {
                if let Inline::Span { marks, .. } = node {
                    update(marks);
                }
            }
            offset += len;
        }
        self.normalize();
        Ok(())
    }

    /// Mutable access to the dropdown at node `index`.
    pub fn dropdown_mut(&mut self, index: usize) -> CanvasResult<&mut Dropdown> {
        match self.nodes.get_mut(index) {
            Some(Inline::Dropdown(dropdown)) => Ok(dropdown),
            _ => Err(CanvasError::invalid(format!("node {index} is not a dropdown"))),
        }
    }

    fn delete_flat(&mut self, start: usize, end: usize) {
        if start == end {
            return;
        }
        let mut offset = 0;
        let mut kept = Vec::with_capacity(self.nodes.len());
        for node in self.nodes.drain(..) {
            let len = node.len();
            let (node_start, node_end) = (offset, offset + len);
            offset = node_end;
            if node_end <= start || node_start >= end {
                kept.push(node);
                continue;
            }
            if let Inline::Span { text, marks } = node {
                let cut_from = start.saturating_sub(node_start);
                let cut_to = (end - node_start).min(len);
                let remaining: String = text
                    .chars()
                    .enumerate()
                    .filter(|(i, _)| *i < cut_from || *i >= cut_to)
                    .map(|(_, c)| c)
                    .collect();
                kept.push(Inline::Span {
                    text: remaining,
                    marks,
                });
            }
            // Atomic nodes overlapping the range are removed whole.
        }
        self.nodes = kept;
        self.normalize();
    }

    fn insert_flat(&mut self, at: usize, inline: Inline) {
        let index = self.split_at(at);
        self.nodes.insert(index, inline);
        self.normalize();
    }

    /// Split the span containing `at` so that a node boundary falls there.
    /// Returns the index of the first node starting at or after `at`.
    fn split_at(&mut self, at: usize) -> usize {
        let mut offset = 0;
        for index in 0..self.nodes.len() {
            let len = self.nodes[index].len();
            if at == offset {
                return index;
            }
            if at < offset + len {
                if let Inline::Span { text, marks } = &self.nodes[index] {
                    let split = at - offset;
                    let head: String = text.chars().take(split).collect();
                    let tail: String = text.chars().skip(split).collect();
                    let marks = marks.clone();
                    self.nodes[index] = Inline::Span {
                        text: head,
                        marks: marks.clone(),
                    };
                    self.nodes.insert(index + 1, Inline::Span { text: tail, marks });
                }
                return index + 1;
            }
            offset += len;
        }
        self.nodes.len()
    }

    fn normalize(&mut self) {
        let mut merged: Vec<Inline> = Vec::with_capacity(self.nodes.len());
        for node in self.nodes.drain(..) {
            if node.is_span() && node.is_empty() {
                continue;
            }
            if let (
                Some(Inline::Span {
                    text: prev_text,
                    marks: prev_marks,
                }),
                Inline::Span { text, marks },
            ) = (merged.last_mut(), &node)
            {
                if prev_marks == marks {
                    prev_text.push_str(text);
                    continue;
                }
            }
            merged.push(node);
        }
        self.nodes = merged;
    }
}

/// Split text into spans and `{{name}}` tokens.
pub(crate) fn split_tokens(text: &str, marks: &Marks) -> Vec<Inline> {
    let mut nodes = Vec::new();
    let mut last = 0;
    for captures in TOKEN_PATTERN.captures_iter(text) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        if whole.start() > last {
            nodes.push(Inline::Span {
                text: text[last..whole.start()].to_string(),
                marks: marks.clone(),
            });
        }
        nodes.push(Inline::token(name.as_str()));
        last = whole.end();
    }
    if last < text.len() {
        nodes.push(Inline::Span {
            text: text[last..].to_string(),
            marks: marks.clone(),
        });
    }
    nodes
}
