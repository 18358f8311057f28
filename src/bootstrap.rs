//! Startup sequence shared by both front-ends.
//!
//! Stages run strictly in order and any failure aborts startup:
//! credential → corpus → index → engine. Nothing is served until
//! [`bootstrap`] returns.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::application::{
    ChatEngine, ChatSettings, CorpusLoader, IndexSettings, ParserRegistry, RagService,
};
use crate::domain::{
    ports::{DocumentParser, EmbeddingService, LlmService, VectorStore},
    Credential, DomainError,
};
use crate::infrastructure::config::{EmbeddingConfig, LlmConfig, ParserConfig};
use crate::infrastructure::parsers::PlainTextParser;
use crate::infrastructure::{AppConfig, InMemoryVectorStore};

/// Factories for the external capabilities the pipeline needs.
///
/// Each factory is only invoked once the previous stage has succeeded, so a
/// missing credential never reaches a parser and an empty corpus never
/// reaches the embedding model.
#[async_trait]
pub trait Backends: Send + Sync {
    fn pdf_parser(&self, credential: Credential, config: &ParserConfig) -> Arc<dyn DocumentParser>;

    fn text_parser(&self) -> Arc<dyn DocumentParser> {
        Arc::new(PlainTextParser)
    }

    /// May download model weights, so it runs under the ingest timeout.
    async fn embedding(
        &self,
        config: &EmbeddingConfig,
    ) -> Result<Arc<dyn EmbeddingService>, DomainError>;

    fn vector_store(&self) -> Arc<dyn VectorStore> {
        Arc::new(InMemoryVectorStore::new())
    }

    fn llm(&self, config: &LlmConfig) -> Result<Arc<dyn LlmService>, DomainError>;
}

/// Builds the parser registry for the configured extensions: `pdf` goes to
/// the PDF parser, everything else to plain text extraction.
pub fn parser_registry(
    extensions: &[String],
    pdf: Arc<dyn DocumentParser>,
    text: Arc<dyn DocumentParser>,
) -> ParserRegistry {
    extensions.iter().fold(ParserRegistry::new(), |registry, ext| {
        let parser = if ext.trim_start_matches('.').eq_ignore_ascii_case("pdf") {
            pdf.clone()
        } else {
            text.clone()
        };
        registry.register(ext, parser)
    })
}

pub async fn bootstrap<F>(
    config: &AppConfig,
    lookup: F,
    backends: &dyn Backends,
) -> Result<Arc<ChatEngine>, DomainError>
where
    F: Fn(&str) -> Option<String>,
{
    let c = &config.config;
    let ingest_timeout = Duration::from_secs(c.ingest.timeout_seconds);

    let credential = Credential::from_lookup(&c.credential_env, lookup)?;
    info!(env = %c.credential_env, "credential loaded");

    let registry = parser_registry(
        &c.data.extensions,
        backends.pdf_parser(credential, &c.parser),
        backends.text_parser(),
    );
    let corpus = CorpusLoader::new(&c.data.dir, registry, ingest_timeout)
        .load()
        .await?;

    let index_settings = IndexSettings {
        chunk_size: c.ingest.chunk_size,
        default_top_k: c.rag.top_k,
        build_timeout: ingest_timeout,
    };
    let embedding = tokio::time::timeout(ingest_timeout, backends.embedding(&c.embedding))
        .await
        .map_err(|_| {
            DomainError::ingestion(format!(
                "loading embedding model {} timed out after {ingest_timeout:?}",
                c.embedding.model
            ))
        })??;
    let rag = RagService::build(
        &corpus,
        embedding,
        backends.vector_store(),
        &index_settings,
    )
    .await?;

    let llm = backends.llm(&c.llm)?;
    info!(
        documents = corpus.len(),
        chunks = rag.chunk_count(),
        model = %c.llm.model,
        "chat engine ready"
    );

    Ok(Arc::new(ChatEngine::new(
        Arc::new(rag),
        llm,
        ChatSettings::from_config(config),
    )))
}
