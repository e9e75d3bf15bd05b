//! Inline `style` attribute parsing.

use regex::Regex;
use std::sync::LazyLock;

static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([+-]?(?:\d+(?:\.\d*)?|\.\d+))").expect("valid number regex"));

/// Declarations of one `style` attribute, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InlineStyle {
    declarations: Vec<(String, String)>,
}

impl InlineStyle {
    /// Parse `name: value; name: value`. Malformed declarations are skipped.
    pub fn parse(style: &str) -> Self {
        let declarations = style
            .split(';')
            .filter_map(|declaration| {
                let (name, value) = declaration.split_once(':')?;
                let name = name.trim().to_ascii_lowercase();
                let value = value.trim();
                (!name.is_empty() && !value.is_empty()).then(|| (name, value.to_string()))
            })
            .collect();
        Self { declarations }
    }

    /// Value of the last declaration of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.declarations
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Leading number of the value of `name`.
    pub fn length(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(leading_number)
    }
}

/// The number a CSS length starts with (`"12px"` is 12, `"px"` is None).
pub fn leading_number(value: &str) -> Option<f64> {
    let captures = LEADING_NUMBER.captures(value)?;
    captures.get(1)?.as_str().parse().ok()
}

/// Format a pixel value without a trailing `.0`.
pub fn px(value: f64) -> String {
    format!("{}px", value)
}
