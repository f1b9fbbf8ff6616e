//! Page extraction: pull a page's embedded text layer.

use super::pdf::PageSource;
use super::postprocess::clean_text;
use crate::error::PageError;
use tracing::debug;

/// Extract the cleaned text layer of page `index` (0-based).
///
/// Returns `Ok(None)` for image-only pages and pages whose text layer is only
/// whitespace. That is the normal signal to fall back to OCR, not an error.
pub fn extract(doc: &dyn PageSource, index: usize) -> Result<Option<String>, PageError> {
    let raw = doc.page_text(index)?;
    let text = clean_text(&raw);
    if text.is_empty() {
        debug!("Page {}: no usable text layer", index + 1);
        Ok(None)
    } else {
        debug!("Page {}: {} chars from text layer", index + 1, text.len());
        Ok(Some(text))
    }
}

/// Whether page `index` carries a usable text layer. Extraction errors count
/// as "no".
pub fn has_text_layer(doc: &dyn PageSource, index: usize) -> bool {
    matches!(extract(doc, index), Ok(Some(_)))
}
