//! Document parsers, one per supported file family.

mod llama_parse;
mod pdf;
mod text;

pub use llama_parse::LlamaParseParser;
pub use pdf::PdfExtractParser;
pub use text::PlainTextParser;

use std::path::Path;

use crate::domain::SourceMetadata;

pub const MIME_PDF: &str = "application/pdf";

/// Content type guessed from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("pdf") => MIME_PDF,
        Some("md" | "markdown") => "text/markdown",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("html" | "htm") => "text/html",
        _ => "text/plain",
    }
}

pub(crate) fn source_for(path: &Path) -> SourceMetadata {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    SourceMetadata::new(
        path.to_string_lossy().to_string(),
        file_name,
        content_type_for(path),
    )
}
