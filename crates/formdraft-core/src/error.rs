//! Error types for canvas operations.

use crate::elements::ElementId;
use thiserror::Error;

/// Errors raised by canvas model operations.
///
/// None of these are fatal: the model is left usable (and, for
/// `InvalidOperation`, unchanged) after any of them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CanvasError {
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Stale cursor reference: {0}")]
    StaleReference(String),
    #[error("Element not found: {0}")]
    ElementNotFound(ElementId),
    #[error("Document conversion failed: {0}")]
    Conversion(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CanvasError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }

    pub(crate) fn stale(message: impl Into<String>) -> Self {
        Self::StaleReference(message.into())
    }
}

/// Problems found while importing markup. Import still produces elements.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportWarning {
    /// The markup could not be parsed and was imported as plain text.
    #[error("Malformed markup imported as text: {0}")]
    MalformedImport(String),
    #[error("Element {index}: unknown kind '{tag}', classified by content")]
    UnknownKind { index: usize, tag: String },
    #[error("Element {index}: table without rows imported as text")]
    EmptyTable { index: usize },
}

/// Result type for canvas operations.
pub type CanvasResult<T> = Result<T, CanvasError>;
