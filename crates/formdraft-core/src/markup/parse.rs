//! Markup import.
//!
//! Input is first normalised into well-formed XML (void tags closed, bare
//! boolean attributes given values, HTML entities made numeric, doctype and
//! declarations dropped), then parsed with roxmltree under a synthetic root.
//! Containers tagged with `data-kind` are decoded exactly; anything else is
//! classified by content.

use super::ImportOutcome;
use super::style::InlineStyle;
use crate::elements::{
    split_tokens, CheckboxBody, Dropdown, Element, ElementBody, ElementId, ElementKind, ElementStyle, Inline,
    Marks, RichText, SerializableColor, TableGrid, TextAlign, TextBody,
};
use crate::error::ImportWarning;
use kurbo::{Point, Size};
use regex::{Captures, Regex};
use roxmltree::{Document, Node};
use std::sync::LazyLock;

static VOID_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(br|hr|img|input|meta|link)(\s[^<>]*?)?\s*/?>").expect("valid void tag regex")
});
static OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[A-Za-z][^<>]*>").expect("valid tag regex"));
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\s+)([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*("[^"]*"|'[^']*'|[^\s"'<>/]+(?:/[^\s"'<>/]+)*))?"#)
        .expect("valid attribute regex")
});
static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]*;|#[0-9]+;|#[xX][0-9A-Fa-f]+;)?").expect("valid entity regex"));
static PROLOGUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<!DOCTYPE[^>]*>|<\?xml.*?\?>").expect("valid prologue regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\r\n\x0C]+").expect("valid whitespace regex"));

const DEFAULT_ORIGIN: Point = Point::new(0.0, 0.0);
const DEFAULT_SIZE: Size = Size::new(100.0, 50.0);

/// Parse exported or foreign markup into elements. Never fails.
pub fn parse(markup: &str) -> ImportOutcome {
    let wrapped = format!("<root>{}</root>", normalize(markup));
    let document = match Document::parse(&wrapped) {
        Ok(document) => document,
        Err(e) => {
            log::warn!("Markup could not be parsed, importing as plain text: {}", e);
            let fallback = Element::with_body(
                ElementId(1),
                DEFAULT_ORIGIN,
                DEFAULT_SIZE,
                ElementBody::Text(TextBody {
                    content: RichText::new(vec![Inline::span(markup.trim())]),
                    align: TextAlign::Left,
                }),
            );
            return ImportOutcome {
                elements: vec![fallback],
                warnings: vec![ImportWarning::MalformedImport(e.to_string())],
            };
        }
    };

    let mut importer = Importer::default();
    for node in content_root(document.root_element()).children() {
        importer.top_level(node);
    }
    log::info!(
        "Imported {} elements with {} warnings",
        importer.elements.len(),
        importer.warnings.len()
    );
    ImportOutcome {
        elements: importer.elements,
        warnings: importer.warnings,
    }
}

/// Rewrite HTML-isms into something an XML parser accepts.
fn normalize(markup: &str) -> String {
    let markup = PROLOGUE.replace_all(markup, "");
    let markup = ENTITY.replace_all(&markup, |caps: &Captures| match caps.get(1) {
        None => "&amp;".to_string(),
        Some(entity) => {
            let entity = entity.as_str();
            if entity.starts_with('#') {
                return format!("&{entity}");
            }
            let name = &entity[..entity.len() - 1];
            match name {
                "amp" | "lt" | "gt" | "quot" | "apos" => format!("&{entity}"),
                _ => match named_entity(name) {
                    Some(code) => format!("&#{code};"),
                    None => format!("&amp;{entity}"),
                },
            }
        }
    });
    let markup = VOID_TAG.replace_all(&markup, |caps: &Captures| {
        let attributes = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        format!("<{}{} />", caps[1].to_ascii_lowercase(), attributes)
    });
    OPEN_TAG
        .replace_all(&markup, |caps: &Captures| normalize_attributes(&caps[0]))
        .into_owned()
}

/// Give bare attributes a value and quote unquoted ones. Quoted values are
/// matched whole, so their contents are never rewritten.
fn normalize_attributes(tag: &str) -> String {
    ATTRIBUTE
        .replace_all(tag, |caps: &Captures| {
            let name = &caps[2];
            match caps.get(3).map(|m| m.as_str()) {
                None => format!("{}{name}=\"{name}\"", &caps[1]),
                Some(value) if value.starts_with(['"', '\'']) => format!("{}{name}={value}", &caps[1]),
                Some(value) => format!("{}{name}=\"{value}\"", &caps[1]),
            }
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<u32> {
    Some(match name {
        "nbsp" => 160,
        "copy" => 169,
        "reg" => 174,
        "deg" => 176,
        "laquo" => 171,
        "raquo" => 187,
        "ndash" => 8211,
        "mdash" => 8212,
        "lsquo" => 8216,
        "rsquo" => 8217,
        "ldquo" => 8220,
        "rdquo" => 8221,
        "bull" => 8226,
        "hellip" => 8230,
        "euro" => 8364,
        "trade" => 8482,
        _ => return None,
    })
}

fn tag(node: Node) -> String {
    node.tag_name().name().to_ascii_lowercase()
}

fn attribute<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attributes()
        .find(|a| a.name().eq_ignore_ascii_case(name))
        .map(|a| a.value())
}

/// Unwrap `<html><body>` documents to the body.
fn content_root<'a, 'input>(root: Node<'a, 'input>) -> Node<'a, 'input> {
    if let Some(body) = root.descendants().find(|n| n.is_element() && tag(*n) == "body") {
        return body;
    }
    root.children()
        .find(|n| n.is_element() && tag(*n) == "html")
        .unwrap_or(root)
}

fn text_content(node: Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

fn collapse(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").into_owned()
}

fn is_checkbox_input(node: Node) -> bool {
    node.is_element()
        && tag(node) == "input"
        && attribute(node, "type").is_none_or(|t| t.eq_ignore_ascii_case("checkbox"))
}

#[derive(Default)]
struct Importer {
    elements: Vec<Element>,
    warnings: Vec<ImportWarning>,
}

impl Importer {
    fn push(&mut self, origin: Point, size: Size, style: ElementStyle, body: ElementBody) {
        let id = ElementId(self.elements.len() as u64 + 1);
        let mut element = Element::with_body(id, origin, size, body);
        element.style = style;
        self.elements.push(element);
    }

    fn top_level(&mut self, node: Node) {
        if node.is_text() {
            let text = node.text().map(str::trim).unwrap_or_default();
            if !text.is_empty() {
                let body = text_body(RichText::plain(&collapse(text)), TextAlign::Left);
                self.push(DEFAULT_ORIGIN, DEFAULT_SIZE, ElementStyle::default(), body);
            }
            return;
        }
        if !node.is_element() || matches!(tag(node).as_str(), "head" | "script" | "style" | "meta" | "link" | "title") {
            return;
        }

        let index = self.elements.len();
        let style = InlineStyle::parse(attribute(node, "style").unwrap_or_default());
        let origin = Point::new(
            style.length("left").unwrap_or(DEFAULT_ORIGIN.x),
            style.length("top").unwrap_or(DEFAULT_ORIGIN.y),
        );
        let size = Size::new(
            style.length("width").unwrap_or(DEFAULT_SIZE.width),
            style.length("height").unwrap_or(DEFAULT_SIZE.height),
        );
        let element_style = ElementStyle {
            background_color: style.get("background-color").and_then(SerializableColor::parse_css),
            margin: style.length("margin").unwrap_or(0.0).max(0.0),
            padding: style.length("padding").unwrap_or(0.0).max(0.0),
        };
        let align = style
            .get("text-align")
            .and_then(TextAlign::from_css)
            .unwrap_or_default();

        let tagged = match attribute(node, "data-kind") {
            Some(tag) => match tag.parse::<ElementKind>() {
                Ok(kind) => Some(kind),
                Err(_) => {
                    self.warnings.push(ImportWarning::UnknownKind {
                        index,
                        tag: tag.to_string(),
                    });
                    None
                }
            },
            None => None,
        };
        let exact = tagged.is_some();
        let kind = tagged.unwrap_or_else(|| classify(node));

        let body = match kind {
            ElementKind::Table => match table_body(node, exact) {
                Some(grid) => ElementBody::Table(grid),
                None => {
                    self.warnings.push(ImportWarning::EmptyTable { index });
                    text_body(RichText::plain(collapse(&text_content(node)).trim()), align)
                }
            },
            ElementKind::Checkbox => ElementBody::Checkbox(checkbox_body(node, exact)),
            ElementKind::Text => {
                let mut nodes = Vec::new();
                collect_inlines(node, &Marks::default(), exact, &mut nodes);
                if !exact {
                    trim_edges(&mut nodes);
                }
                text_body(RichText::new(nodes), align)
            }
        };
        self.push(origin, size, element_style, body);
    }
}

fn text_body(content: RichText, align: TextAlign) -> ElementBody {
    ElementBody::Text(TextBody { content, align })
}

/// Classify an untagged container: tables first, then input controls.
fn classify(node: Node) -> ElementKind {
    if node.descendants().any(|n| n.is_element() && tag(n) == "table") {
        ElementKind::Table
    } else if node.descendants().any(|n| n.is_element() && tag(n) == "input") {
        ElementKind::Checkbox
    } else {
        ElementKind::Text
    }
}

fn table_body(node: Node, exact: bool) -> Option<TableGrid> {
    let table = node.descendants().find(|n| n.is_element() && tag(*n) == "table")?;
    let rows = table
        .descendants()
        .filter(|n| n.is_element() && tag(*n) == "tr")
        .map(|row| {
            row.children()
                .filter(|c| c.is_element() && matches!(tag(*c).as_str(), "td" | "th"))
                .map(|cell| {
                    let text = text_content(cell);
                    if exact { text } else { collapse(&text).trim().to_string() }
                })
                .collect::<Vec<_>>()
        })
        .collect();
    TableGrid::from_rows(rows)
}

fn checkbox_body(node: Node, exact: bool) -> CheckboxBody {
    let checked = node
        .descendants()
        .find(|n| is_checkbox_input(*n))
        .is_some_and(|input| attribute(input, "checked").is_some());
    let label = text_content(node);
    let label = if exact {
        label
    } else {
        collapse(&label).trim().to_string()
    };
    CheckboxBody {
        checked,
        label: if label.is_empty() && !exact {
            CheckboxBody::default().label
        } else {
            label
        },
    }
}

fn span_marks(node: Node, inherited: &Marks) -> Marks {
    let mut marks = inherited.clone();
    match tag(node).as_str() {
        "b" | "strong" => marks.bold = true,
        "i" | "em" => marks.italic = true,
        "u" | "ins" => marks.underline = true,
        _ => {}
    }
    if let Some(color) = attribute(node, "color").and_then(SerializableColor::parse_css) {
        marks.color = Some(color);
    }
    let style = InlineStyle::parse(attribute(node, "style").unwrap_or_default());
    if let Some(color) = style.get("color").and_then(SerializableColor::parse_css) {
        marks.color = Some(color);
    }
    if let Some(size) = style.length("font-size").filter(|s| *s > 0.0) {
        marks.font_size = Some(size.round() as u32);
    }
    match style.get("font-weight") {
        Some("bold") | Some("700") => marks.bold = true,
        Some("normal") | Some("400") => marks.bold = false,
        _ => {}
    }
    if style.get("font-style") == Some("italic") {
        marks.italic = true;
    }
    if style.get("text-decoration").is_some_and(|d| d.contains("underline")) {
        marks.underline = true;
    }
    marks
}

fn dropdown(node: Node, exact: bool) -> Option<Dropdown> {
    let options: Vec<Node> = node
        .descendants()
        .filter(|n| n.is_element() && tag(*n) == "option")
        .collect();
    if options.is_empty() {
        return None;
    }
    let mut dropdown = Dropdown::new(
        options
            .iter()
            .map(|o| {
                let text = text_content(*o);
                if exact { text } else { text.trim().to_string() }
            })
            .collect(),
    );
    let marked = options.iter().position(|o| attribute(*o, "selected").is_some());
    dropdown.selected = match attribute(node, "data-selected") {
        // With duplicate labels the marked option tells them apart.
        Some(value) => marked
            .filter(|&i| dropdown.options[i] == value)
            .or_else(|| dropdown.options.iter().position(|o| o == value))
            .or(marked),
        None => marked,
    };
    Some(dropdown)
}

fn collect_inlines(node: Node, marks: &Marks, exact: bool, out: &mut Vec<Inline>) {
    for child in node.children() {
        if child.is_text() {
            let text = child.text().unwrap_or_default();
            let text = if exact { text.to_string() } else { collapse(text) };
            out.extend(split_tokens(&text, marks));
            continue;
        }
        if !child.is_element() {
            continue;
        }
        match tag(child).as_str() {
            "br" => out.push(Inline::LineBreak),
            "select" => out.extend(dropdown(child, exact).map(Inline::Dropdown)),
            "input" => {
                if is_checkbox_input(child) {
                    out.push(Inline::Checkbox {
                        checked: attribute(child, "checked").is_some(),
                    });
                }
            }
            "script" | "style" | "head" | "title" => {}
            "p" | "div" | "li" | "tr" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                if out.last().is_some_and(|last| *last != Inline::LineBreak) {
                    out.push(Inline::LineBreak);
                }
                collect_inlines(child, &span_marks(child, marks), exact, out);
            }
            _ => collect_inlines(child, &span_marks(child, marks), exact, out),
        }
    }
}

/// Drop layout whitespace at the start and end of loosely formatted content.
fn trim_edges(nodes: &mut Vec<Inline>) {
    if let Some(Inline::Span { text, .. }) = nodes.first_mut() {
        *text = text.trim_start().to_string();
    }
    if let Some(Inline::Span { text, .. }) = nodes.last_mut() {
        *text = text.trim_end().to_string();
    }
    nodes.retain(|n| !matches!(n, Inline::Span { text, .. } if text.is_empty()));
}
