//! Export to and import from absolute-positioned markup.

mod parse;
mod serialize;
mod style;

pub use parse::parse;
pub use serialize::{rich_text, serialize, serialize_element};
pub use style::{InlineStyle, leading_number};

use crate::elements::Element;
use crate::error::ImportWarning;

/// Result of an import: the elements in document order plus anything that
/// had to be guessed or repaired on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    pub elements: Vec<Element>,
    pub warnings: Vec<ImportWarning>,
}
