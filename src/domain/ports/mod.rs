mod document_parser;
mod embedding;
mod llm;
mod vector_store;

pub use document_parser::DocumentParser;
pub use embedding::EmbeddingService;
pub use llm::{CompletionRequest, LlmService};
pub use vector_store::VectorStore;
