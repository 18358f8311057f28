use async_trait::async_trait;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::{Chat, Message as RigMessage};
use rig::providers::ollama;

use crate::domain::{
    ports::{CompletionRequest, LlmService},
    DomainError, Message, MessageRole,
};

/// Chat completion against a local Ollama server.
///
/// The client reads its endpoint from `OLLAMA_API_BASE_URL`.
pub struct OllamaLlm {
    client: ollama::Client,
    model: String,
}

impl OllamaLlm {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: ollama::Client::from_env(),
            model: model.into(),
        }
    }
}

fn to_rig_history(history: &[Message]) -> Vec<RigMessage> {
    history
        .iter()
        .filter_map(|m| match m.role {
            MessageRole::User => Some(RigMessage::user(m.content.clone())),
            MessageRole::Assistant => Some(RigMessage::assistant(m.content.clone())),
            // System text travels as the agent preamble.
            MessageRole::System => None,
        })
        .collect()
}

#[async_trait]
impl LlmService for OllamaLlm {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, DomainError> {
        let agent = self
            .client
            .agent(&self.model)
            .preamble(&request.system)
            .build();

        agent
            .chat(request.message.as_str(), to_rig_history(&request.history))
            .await
            .map_err(|e| DomainError::external(format!("Ollama chat failed: {e}")))
    }
}
