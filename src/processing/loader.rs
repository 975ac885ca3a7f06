//! PDF loading: raw upload bytes to ordered page text.

use super::types::{LoadError, PageText};
use lopdf::Document;

/// How far into the buffer the `%PDF-` marker may appear.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Extract per-page text from a PDF held in memory.
///
/// Pages that yield only whitespace are skipped, as are pages whose content streams cannot be
/// decoded; both are logged. A document with no text at all is rejected so that nothing empty is
/// ever indexed.
pub fn load_pdf(bytes: &[u8]) -> Result<Vec<PageText>, LoadError> {
    if !has_pdf_header(bytes) {
        return Err(LoadError::NotPdf);
    }

    let document =
        Document::load_mem(bytes).map_err(|error| LoadError::Malformed(error.to_string()))?;
    if document.is_encrypted() {
        return Err(LoadError::Encrypted);
    }

    let pages = document.get_pages();
    if pages.is_empty() {
        return Err(LoadError::NoPages);
    }
    let page_count = pages.len();

    let mut extracted = Vec::with_capacity(page_count);
    for page_number in pages.into_keys() {
        match document.extract_text(&[page_number]) {
            Ok(text) if text.trim().is_empty() => {
                tracing::debug!(page_number, "Skipping page without text");
            }
            Ok(text) => extracted.push(PageText { page_number, text }),
            Err(error) => {
                tracing::warn!(page_number, error = %error, "Failed to extract page text");
            }
        }
    }

    if extracted.is_empty() {
        return Err(LoadError::NoText);
    }

    tracing::debug!(
        page_count,
        text_pages = extracted.len(),
        "Extracted PDF text"
    );
    Ok(extracted)
}

fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    window.windows(5).any(|candidate| candidate == b"%PDF-")
}
