use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::domain::{
    chunk_document,
    ports::{EmbeddingService, VectorStore},
    Document, DocumentChunk, DomainError, SearchResult,
};

#[derive(Debug, Clone)]
pub struct IndexSettings {
    pub chunk_size: usize,
    pub default_top_k: usize,
    /// Upper bound for embedding the whole corpus.
    pub build_timeout: Duration,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            default_top_k: 2,
            build_timeout: Duration::from_secs(600),
        }
    }
}

/// Retrieval over an index that is built once and never modified afterwards.
pub struct RagService {
    embedding: Arc<dyn EmbeddingService>,
    vector_store: Arc<dyn VectorStore>,
    default_top_k: usize,
    chunk_count: usize,
}

impl RagService {
    /// Chunks and embeds every document exactly once, then hands back a
    /// read-only service. Fails on an empty corpus, on embedding errors, or
    /// when embedding overruns `build_timeout`.
    #[instrument(skip_all, fields(documents = documents.len()))]
    pub async fn build(
        documents: &[Document],
        embedding: Arc<dyn EmbeddingService>,
        vector_store: Arc<dyn VectorStore>,
        settings: &IndexSettings,
    ) -> Result<Self, DomainError> {
        if documents.is_empty() {
            return Err(DomainError::configuration("cannot build an index from an empty corpus"));
        }

        let chunks: Vec<DocumentChunk> = documents
            .iter()
            .flat_map(|doc| chunk_document(doc, settings.chunk_size))
            .collect();
        if chunks.is_empty() {
            return Err(DomainError::ingestion("corpus contains no indexable text"));
        }

        tokio::time::timeout(
            settings.build_timeout,
            index_chunks(embedding.as_ref(), vector_store.as_ref(), &chunks),
        )
        .await
        .map_err(|_| {
            DomainError::ingestion(format!(
                "embedding {} chunks timed out after {:?}",
                chunks.len(),
                settings.build_timeout
            ))
        })?
        .map_err(|e| match e {
            DomainError::Ingestion(_) => e,
            other => DomainError::ingestion(format!("index build failed: {other}")),
        })?;

        let chunk_count = vector_store.len().await?;
        tracing::info!(chunks = chunk_count, dimension = embedding.dimension(), "index built");

        Ok(Self {
            embedding,
            vector_store,
            default_top_k: settings.default_top_k,
            chunk_count,
        })
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    #[instrument(skip(self))]
    pub async fn retrieve(&self, query: &str) -> Result<Vec<SearchResult>, DomainError> {
        self.retrieve_top_k(query, self.default_top_k).await
    }

    #[instrument(skip(self))]
    pub async fn retrieve_top_k(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        let embedding = self.embedding.embed(query).await?;
        self.vector_store.search(&embedding, top_k).await
    }
}

async fn index_chunks(
    embedding: &dyn EmbeddingService,
    vector_store: &dyn VectorStore,
    chunks: &[DocumentChunk],
) -> Result<(), DomainError> {
    let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    let embeddings = embedding.embed_batch(&texts).await?;

    if embeddings.len() != chunks.len() {
        return Err(DomainError::ingestion(format!(
            "embedding returned {} vectors for {} chunks",
            embeddings.len(),
            chunks.len()
        )));
    }

    let expected = embedding.dimension();
    if let Some(mismatch) = embeddings.iter().find(|e| e.dimension() != expected) {
        return Err(DomainError::ingestion(format!(
            "embedding model produced {}-dimensional vectors, configured for {expected}",
            mismatch.dimension()
        )));
    }

    for (chunk, vector) in chunks.iter().zip(embeddings.iter()) {
        vector_store.upsert(chunk, vector).await?;
    }

    Ok(())
}
