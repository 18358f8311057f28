use std::path::Path;

use crate::domain::{errors::DomainError, Document};
use async_trait::async_trait;

/// Turns the bytes of one file into one or more documents.
#[async_trait]
pub trait DocumentParser: Send + Sync {
    async fn parse(&self, path: &Path, bytes: Vec<u8>) -> Result<Vec<Document>, DomainError>;

    fn name(&self) -> &'static str;
}
