use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};

use crate::domain::{ports::EmbeddingService, DomainError, Embedding};
use crate::infrastructure::config::EmbeddingConfig;

/// Sentence embeddings computed in-process with fastembed.
///
/// The model is downloaded from Hugging Face on first use and cached; after
/// that no network access is needed.
pub struct LocalEmbedding {
    model: Arc<Mutex<TextEmbedding>>,
    dimension: usize,
    batch_size: usize,
}

impl LocalEmbedding {
    /// Loads the model, downloading it first if it is not cached. Both run on
    /// the blocking pool.
    pub async fn from_config(config: &EmbeddingConfig) -> Result<Self, DomainError> {
        let model_kind = resolve_model(&config.model)?;
        let cache_dir = config.cache_dir.clone();

        let model = tokio::task::spawn_blocking(move || {
            let mut options = InitOptions::new(model_kind);
            if let Some(dir) = cache_dir {
                options = options.with_cache_dir(dir);
            }
            TextEmbedding::try_new(options).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| DomainError::internal(e.to_string()))?
        .map_err(|e| {
            DomainError::configuration(format!(
                "failed to initialize embedding model {}: {e}",
                config.model
            ))
        })?;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            dimension: config.dimension,
            batch_size: config.batch_size,
        })
    }

    async fn run(&self, texts: Vec<String>) -> Result<Vec<Embedding>, DomainError> {
        let model = self.model.clone();
        let batch_size = self.batch_size;

        let vectors = tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|e| DomainError::internal(e.to_string()))?;
            model
                .embed(texts, Some(batch_size))
                .map_err(|e| DomainError::external(format!("local embedding failed: {e}")))
        })
        .await
        .map_err(|e| DomainError::internal(e.to_string()))??;

        Ok(vectors.into_iter().map(Embedding::new).collect())
    }
}

fn resolve_model(name: &str) -> Result<EmbeddingModel, DomainError> {
    match name {
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(EmbeddingModel::BGELargeENV15),
        "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "nomic-embed-text-v1.5" => Ok(EmbeddingModel::NomicEmbedTextV15),
        other => Err(DomainError::configuration(format!(
            "unknown embedding model '{other}'; supported: bge-small-en-v1.5, \
             bge-base-en-v1.5, bge-large-en-v1.5, all-minilm-l6-v2, nomic-embed-text-v1.5"
        ))),
    }
}

#[async_trait]
impl EmbeddingService for LocalEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        self.run(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::internal("No embedding returned"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.run(texts.iter().map(|t| t.to_string()).collect()).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
