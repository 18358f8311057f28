use async_trait::async_trait;
use std::sync::Arc;

use crate::bootstrap::Backends;
use crate::domain::{
    ports::{DocumentParser, EmbeddingService, LlmService},
    Credential, DomainError,
};
use crate::infrastructure::config::{EmbeddingConfig, LlmConfig, ParserConfig, PdfBackend};
use crate::infrastructure::llm::OllamaLlm;
use crate::infrastructure::parsers::{LlamaParseParser, PdfExtractParser};

/// Production capabilities: LlamaParse (or local extraction) for PDFs,
/// fastembed for embeddings, Ollama for generation.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultBackends;

#[async_trait]
impl Backends for DefaultBackends {
    fn pdf_parser(&self, credential: Credential, config: &ParserConfig) -> Arc<dyn DocumentParser> {
        match config.pdf_backend {
            PdfBackend::LlamaParse => Arc::new(LlamaParseParser::new(credential, config)),
            PdfBackend::Local => Arc::new(PdfExtractParser),
        }
    }

    #[cfg(feature = "local-embeddings")]
    async fn embedding(
        &self,
        config: &EmbeddingConfig,
    ) -> Result<Arc<dyn EmbeddingService>, DomainError> {
        let embedding =
            crate::infrastructure::embedding::LocalEmbedding::from_config(config).await?;
        Ok(Arc::new(embedding))
    }

    #[cfg(not(feature = "local-embeddings"))]
    async fn embedding(
        &self,
        config: &EmbeddingConfig,
    ) -> Result<Arc<dyn EmbeddingService>, DomainError> {
        Err(DomainError::configuration(format!(
            "embedding model {} requires the local-embeddings feature",
            config.model
        )))
    }

    fn llm(&self, config: &LlmConfig) -> Result<Arc<dyn LlmService>, DomainError> {
        if config.model.trim().is_empty() {
            return Err(DomainError::configuration("llm.model must be set"));
        }
        Ok(Arc::new(OllamaLlm::new(&config.model)))
    }
}
