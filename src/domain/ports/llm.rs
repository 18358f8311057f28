use crate::domain::{errors::DomainError, Message};
use async_trait::async_trait;

/// Everything the model sees for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Persona followed by the retrieved context block.
    pub system: String,
    /// Prior turns, oldest first.
    pub history: Vec<Message>,
    pub message: String,
}

#[async_trait]
pub trait LlmService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, DomainError>;
}
