mod conversation;
mod credential;
mod document;
mod embedding;
mod memory;

pub use conversation::{Message, MessageRole, Turn};
pub use credential::Credential;
pub use document::{
    chunk_content, chunk_document, ChunkMetadata, Document, DocumentChunk, SearchResult,
    SourceMetadata,
};
pub use embedding::Embedding;
pub use memory::{estimate_tokens, ChatMemory, TokenCounter, DEFAULT_TOKEN_LIMIT};
