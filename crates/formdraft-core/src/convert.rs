//! Seam for the external document converter.

use crate::error::CanvasError;

/// Turns an uploaded binary document into markup that [`crate::markup::parse`]
/// understands. Implemented by the host, usually as a call to a remote
/// conversion service.
pub trait DocumentConverter {
    fn convert(&self, document: &[u8]) -> Result<String, CanvasError>;
}

impl<F> DocumentConverter for F
where
    F: Fn(&[u8]) -> Result<String, CanvasError>,
{
    fn convert(&self, document: &[u8]) -> Result<String, CanvasError> {
        self(document)
    }
}
