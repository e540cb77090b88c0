//! Turns an uploaded result sheet into raw text for the parser.
//!
//! PDFs go through `pdf-extract`, which concatenates every page in reading
//! order. Anything else is read as text that was already extracted.

use std::fmt::Display;
use std::panic::{self, UnwindSafe};
use std::path::Path;

use anyhow::{bail, Context};

pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Reads `path` into text.
///
/// Fails when the file cannot be opened or decoded. A readable file with no
/// student records is not an error here; the parser simply finds nothing.
pub fn load_text(path: &Path) -> anyhow::Result<String> {
    if is_pdf(path) {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        extract_pdf_text(&bytes).with_context(|| format!("unreadable PDF {}", path.display()))
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read text from {}", path.display()))
    }
}

pub fn extract_pdf_text(bytes: &[u8]) -> anyhow::Result<String> {
    if bytes.is_empty() {
        bail!("PDF is empty");
    }
    let text = guard_extraction(|| pdf_extract::extract_text_from_mem(bytes))?;
    tracing::debug!(chars = text.len(), "extracted PDF text");
    Ok(text)
}

/// Runs a text extractor, turning both its error and a panic inside it into
/// an ordinary error. `pdf-extract` panics on some malformed documents.
fn guard_extraction<F, E>(extract: F) -> anyhow::Result<String>
where
    F: FnOnce() -> Result<String, E> + UnwindSafe,
    E: Display,
{
    match panic::catch_unwind(extract) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => bail!("PDF text extraction failed: {e}"),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::warn!(%message, "PDF parser panicked");
            bail!("PDF parser panicked: {message}")
        }
    }
}
