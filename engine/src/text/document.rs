//! Text document loading
//!
//! Plain files are read as UTF-8. PDFs go through `pdf-extract`; its output
//! separates pages with form feeds, and pages are re-joined with newlines.

use sdk::PipelineError;
use std::path::Path;
use tracing::{debug, warn};

/// Raw text plus the line view the profiler works on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocument {
    pub text: String,
    pub lines: Vec<String>,
}

impl TextDocument {
    /// Document from in-memory text
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let lines = text.lines().map(str::to_string).collect();
        Self { text, lines }
    }

    /// Document from extracted pages; lines never span a page break
    pub fn from_pages(pages: &[String]) -> Self {
        let lines = pages
            .iter()
            .flat_map(|page| page.lines().map(str::to_string))
            .collect();
        Self {
            text: pages.join("\n"),
            lines,
        }
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Load a text or PDF file
pub fn load_document(path: &Path) -> Result<TextDocument, PipelineError> {
    if is_pdf(path) {
        let bytes = std::fs::read(path).map_err(|e| {
            PipelineError::Input(format!("failed to read {}: {}", path.display(), e))
        })?;
        let pages = extract_pdf_pages(&bytes)
            .map_err(|e| PipelineError::Input(format!("{}: {}", path.display(), e)))?;
        debug!("Extracted {} PDF pages from {}", pages.len(), path.display());
        return Ok(TextDocument::from_pages(&pages));
    }

    let text = std::fs::read_to_string(path).map_err(|e| {
        PipelineError::Input(format!("failed to read {} as UTF-8: {}", path.display(), e))
    })?;
    Ok(TextDocument::from_text(text))
}

/// Run an extractor, turning its errors and panics into messages.
/// pdf-extract can panic on malformed fonts.
fn guarded_extract<E: std::fmt::Display>(
    extract: impl FnOnce() -> Result<String, E>,
) -> Result<String, String> {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(extract)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(format!("PDF extraction failed: {}", e)),
        Err(_) => {
            warn!("PDF extraction panicked");
            Err("PDF extraction panicked - likely contains malformed fonts".to_string())
        }
    }
}

fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>, String> {
    let text = guarded_extract(|| pdf_extract::extract_text_from_mem(bytes))?;

    let mut pages: Vec<String> = text.split('\x0c').map(str::to_string).collect();
    // Trailing form feed after the last page
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    Ok(pages)
}
