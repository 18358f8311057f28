//! Stub capabilities shared by unit tests.

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::application::{ChatEngine, ChatSettings, IndexSettings, RagService};
use crate::bootstrap::Backends;
use crate::domain::{
    ports::{CompletionRequest, DocumentParser, EmbeddingService, LlmService, VectorStore},
    Credential, Document, DomainError, Embedding, SourceMetadata,
};
use crate::infrastructure::config::{EmbeddingConfig, LlmConfig, ParserConfig};
use crate::infrastructure::InMemoryVectorStore;

const HASH_DIMENSION: usize = 256;

/// Bag-of-words embedding: each lower-cased word bumps one hashed bucket.
#[derive(Default)]
pub struct HashEmbedding {
    pub embedded_texts: AtomicUsize,
}

impl HashEmbedding {
    fn vector(text: &str) -> Embedding {
        let mut vector = vec![0.0; HASH_DIMENSION];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0xcbf29ce484222325_u64, |h, b| {
                    (h ^ b as u64).wrapping_mul(0x100000001b3)
                });
            vector[(hash % HASH_DIMENSION as u64) as usize] += 1.0;
        }
        Embedding::new(vector)
    }
}

#[async_trait]
impl EmbeddingService for HashEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        Ok(Self::vector(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        self.embedded_texts.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimension(&self) -> usize {
        HASH_DIMENSION
    }
}

pub struct StallingEmbedding;

#[async_trait]
impl EmbeddingService for StallingEmbedding {
    async fn embed(&self, _text: &str) -> Result<Embedding, DomainError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(DomainError::internal("unreachable"))
    }

    async fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(DomainError::internal("unreachable"))
    }

    fn dimension(&self) -> usize {
        HASH_DIMENSION
    }
}

/// Replies with the context block it was given, so tests can see exactly
/// what was retrieved.
#[derive(Default)]
pub struct EchoLlm {
    last: Mutex<Option<CompletionRequest>>,
}

impl EchoLlm {
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last.lock().unwrap().clone()
    }

    fn reply(request: &CompletionRequest) -> String {
        request
            .system
            .split_once('\n')
            .map(|(_, context)| context.to_string())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmService for EchoLlm {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, DomainError> {
        *self.last.lock().unwrap() = Some(request.clone());
        Ok(Self::reply(request))
    }
}

/// Hangs on its first call, echoes afterwards.
pub struct StallingLlm {
    stall: AtomicBool,
    pub calls: AtomicUsize,
}

impl StallingLlm {
    pub fn stall_first() -> Self {
        Self {
            stall: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LlmService for StallingLlm {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.stall.swap(false, Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(EchoLlm::reply(request))
    }
}

pub struct FailingLlm;

#[async_trait]
impl LlmService for FailingLlm {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, DomainError> {
        Err(DomainError::external("connection refused"))
    }
}

/// Counts calls and turns any file into `sections` documents.
pub struct CountingParser {
    pub calls: AtomicUsize,
    sections: usize,
}

impl CountingParser {
    pub fn with_sections(sections: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            sections,
        }
    }
}

impl Default for CountingParser {
    fn default() -> Self {
        Self::with_sections(1)
    }
}

#[async_trait]
impl DocumentParser for CountingParser {
    async fn parse(&self, path: &Path, _bytes: Vec<u8>) -> Result<Vec<Document>, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let source = SourceMetadata::new(
            path.to_string_lossy().to_string(),
            path.file_name().unwrap().to_string_lossy().to_string(),
            "application/pdf",
        );
        Ok((0..self.sections)
            .map(|i| Document::new(format!("section {i}"), source.clone()))
            .collect())
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

pub struct FailingParser;

#[async_trait]
impl DocumentParser for FailingParser {
    async fn parse(&self, _path: &Path, _bytes: Vec<u8>) -> Result<Vec<Document>, DomainError> {
        Err(DomainError::external("service unavailable"))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

pub struct StallingParser;

#[async_trait]
impl DocumentParser for StallingParser {
    async fn parse(&self, _path: &Path, _bytes: Vec<u8>) -> Result<Vec<Document>, DomainError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "stalling"
    }
}

#[derive(Default)]
pub struct StubBackends {
    pub parser: Arc<CountingParser>,
    pub embedding: Arc<HashEmbedding>,
    pub llm: Arc<EchoLlm>,
    pub pdf_parsers_built: AtomicUsize,
    pub embedders_built: AtomicUsize,
    /// Makes the embedding factory hang, like a stalled model download.
    pub stall_embedding: bool,
}

#[async_trait]
impl Backends for StubBackends {
    fn pdf_parser(&self, _credential: Credential, _config: &ParserConfig) -> Arc<dyn DocumentParser> {
        self.pdf_parsers_built.fetch_add(1, Ordering::SeqCst);
        self.parser.clone()
    }

    async fn embedding(
        &self,
        _config: &EmbeddingConfig,
    ) -> Result<Arc<dyn EmbeddingService>, DomainError> {
        self.embedders_built.fetch_add(1, Ordering::SeqCst);
        if self.stall_embedding {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(self.embedding.clone())
    }

    fn llm(&self, _config: &LlmConfig) -> Result<Arc<dyn LlmService>, DomainError> {
        Ok(self.llm.clone())
    }
}

pub fn documents(texts: &[&str]) -> Vec<Document> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let name = format!("doc{i}.txt");
            Document::new(
                *text,
                SourceMetadata::new(format!("data/{name}"), name, "text/plain"),
            )
        })
        .collect()
}

pub async fn engine_with_corpus(
    texts: &[&str],
    llm: Arc<dyn LlmService>,
    settings: ChatSettings,
) -> Arc<ChatEngine> {
    let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
    let rag = RagService::build(
        &documents(texts),
        Arc::new(HashEmbedding::default()),
        store,
        &IndexSettings::default(),
    )
    .await
    .unwrap();
    Arc::new(ChatEngine::new(Arc::new(rag), llm, settings))
}
