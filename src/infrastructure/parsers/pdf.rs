use async_trait::async_trait;
use std::path::Path;

use super::source_for;
use crate::domain::{ports::DocumentParser, Document, DomainError};

/// Offline PDF text extraction.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractParser;

#[async_trait]
impl DocumentParser for PdfExtractParser {
    async fn parse(&self, path: &Path, bytes: Vec<u8>) -> Result<Vec<Document>, DomainError> {
        let text = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&bytes).map_err(|e| e.to_string())
        })
        .await
        // pdf-extract panics on some malformed files; treat that as a parse failure too.
        .map_err(|e| e.to_string())
        .and_then(|result| result)
        .map_err(|e| {
            DomainError::ingestion(format!("PDF extraction failed for {}: {e}", path.display()))
        })?;

        Ok(vec![Document::new(text, source_for(path))])
    }

    fn name(&self) -> &'static str {
        "pdf_extract"
    }
}
