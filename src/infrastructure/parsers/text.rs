use async_trait::async_trait;
use std::path::Path;

use super::source_for;
use crate::domain::{ports::DocumentParser, Document, DomainError};

/// Reads UTF-8 files as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextParser;

#[async_trait]
impl DocumentParser for PlainTextParser {
    async fn parse(&self, path: &Path, bytes: Vec<u8>) -> Result<Vec<Document>, DomainError> {
        let text = String::from_utf8(bytes).map_err(|e| {
            DomainError::ingestion(format!("{} is not valid UTF-8: {e}", path.display()))
        })?;
        Ok(vec![Document::new(text, source_for(path))])
    }

    fn name(&self) -> &'static str {
        "plain_text"
    }
}
