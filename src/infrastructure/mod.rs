pub mod backends;
pub mod config;
pub mod embedding;
pub mod llm;
pub mod parsers;
pub mod vector_store;

pub use backends::DefaultBackends;
pub use config::{AppConfig, Config, PromptsConfig};
pub use llm::OllamaLlm;
pub use vector_store::InMemoryVectorStore;
