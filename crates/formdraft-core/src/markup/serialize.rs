//! Canvas state to absolute-positioned markup.

use super::style::px;
use crate::canvas::CanvasState;
use crate::elements::{Dropdown, Element, ElementBody, Inline, Marks, RichText, TableGrid, TextAlign};
use std::fmt::Write;

const TABLE_STYLE: &str = "width: 100%; height: 100%; border-collapse: collapse; border: 1px solid #333;";
const CELL_STYLE: &str = "border: 1px solid #333; padding: 5px;";

/// Export every element in flow order, one container per line.
pub fn serialize(state: &CanvasState) -> String {
    state
        .elements
        .iter()
        .map(|element| serialize_element(element))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Export one element as a positioned `<div>`.
pub fn serialize_element(element: &Element) -> String {
    let mut style = format!(
        "position: absolute; left: {}; top: {}; width: {}; height: {};",
        px(element.origin.x),
        px(element.origin.y),
        px(element.size.width),
        px(element.size.height)
    );
    if let Some(color) = element.style.background_color {
        let _ = write!(style, " background-color: {};", color.to_css());
    }
    if element.style.margin != 0.0 {
        let _ = write!(style, " margin: {};", px(element.style.margin));
    }
    if element.style.padding != 0.0 {
        let _ = write!(style, " padding: {};", px(element.style.padding));
    }

    let inner = match &element.body {
        ElementBody::Text(text) => {
            if text.align != TextAlign::Left {
                let _ = write!(style, " text-align: {};", text.align.as_css());
            }
            rich_text(&text.content)
        }
        ElementBody::Checkbox(checkbox) => format!(
            "<label>{}{}</label>",
            checkbox_input(checkbox.checked),
            escape_text(&checkbox.label)
        ),
        ElementBody::Table(grid) => table(grid),
    };

    format!(
        "<div data-kind=\"{}\" style=\"{}\">{}</div>",
        element.kind(),
        escape_attr(&style),
        inner
    )
}

/// Inline markup for rich text content.
pub fn rich_text(content: &RichText) -> String {
    let mut out = String::new();
    for node in content.nodes() {
        match node {
            Inline::Span { text, marks } => span(&mut out, text, marks),
            Inline::Token { name } => {
                out.push_str("{{");
                out.push_str(&escape_text(name));
                out.push_str("}}");
            }
            Inline::Dropdown(dropdown) => select(&mut out, dropdown),
            Inline::Checkbox { checked } => out.push_str(&checkbox_input(*checked)),
            Inline::LineBreak => out.push_str("<br />"),
        }
    }
    out
}

fn span(out: &mut String, text: &str, marks: &Marks) {
    let mut css = String::new();
    if let Some(color) = marks.color {
        let _ = write!(css, "color: {};", color.to_css());
    }
    if let Some(size) = marks.font_size {
        if !css.is_empty() {
            css.push(' ');
        }
        let _ = write!(css, "font-size: {}px;", size);
    }

    let mut close = Vec::new();
    if !css.is_empty() {
        let _ = write!(out, "<span style=\"{}\">", escape_attr(&css));
        close.push("</span>");
    }
    for (on, open, end) in [
        (marks.bold, "<b>", "</b>"),
        (marks.italic, "<i>", "</i>"),
        (marks.underline, "<u>", "</u>"),
    ] {
        if on {
            out.push_str(open);
            close.push(end);
        }
    }
    out.push_str(&escape_text(text));
    for end in close.into_iter().rev() {
        out.push_str(end);
    }
}

fn select(out: &mut String, dropdown: &Dropdown) {
    match dropdown.selected_option() {
        Some(selected) => {
            let _ = write!(out, "<select data-selected=\"{}\">", escape_attr(selected));
        }
        None => out.push_str("<select>"),
    }
    for (index, option) in dropdown.options.iter().enumerate() {
        if dropdown.selected == Some(index) {
            let _ = write!(out, "<option selected=\"selected\">{}</option>", escape_text(option));
        } else {
            let _ = write!(out, "<option>{}</option>", escape_text(option));
        }
    }
    out.push_str("</select>");
}

fn checkbox_input(checked: bool) -> String {
    if checked {
        "<input type=\"checkbox\" checked=\"checked\" />".to_string()
    } else {
        "<input type=\"checkbox\" />".to_string()
    }
}

fn table(grid: &TableGrid) -> String {
    let mut out = format!("<table style=\"{}\">", TABLE_STYLE);
    for row in grid.cells() {
        out.push_str("<tr>");
        for cell in row {
            let _ = write!(out, "<td style=\"{}\">{}</td>", CELL_STYLE, escape_text(cell));
        }
        out.push_str("</tr>");
    }
    out.push_str("</table>");
    out
}

/// Characters XML 1.0 cannot carry at all, even as references.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..)
}

fn escape(s: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars().filter(|c| is_xml_char(*c)) {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            // Parsers fold a literal CR into LF, and attribute whitespace into spaces.
            '\r' => out.push_str("&#13;"),
            '\t' | '\n' if attribute => {
                let _ = write!(out, "&#{};", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

fn escape_text(s: &str) -> String {
    escape(s, false)
}

fn escape_attr(s: &str) -> String {
    escape(s, true)
}
