use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::instrument;
use uuid::Uuid;

use crate::application::RagService;
use crate::domain::{
    ports::{CompletionRequest, LlmService},
    ChatMemory, DomainError, Message, SearchResult, Turn,
};
use crate::infrastructure::AppConfig;

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub system_prompt: String,
    /// `{context}` is replaced with the retrieved chunks.
    pub context_template: String,
    pub top_k: usize,
    pub response_timeout: Duration,
    pub memory_token_limit: usize,
}

impl ChatSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            system_prompt: config.prompts.agent.system.clone(),
            context_template: config.prompts.agent.context_template.clone(),
            top_k: config.config.rag.top_k,
            response_timeout: Duration::from_secs(config.config.llm.timeout_seconds),
            memory_token_limit: config.config.memory.token_limit,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_memory_limit(mut self, token_limit: usize) -> Self {
        self.memory_token_limit = token_limit;
        self
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Shared, immutable half of the conversation loop: index, model and persona.
/// Each [`ChatSession`] created from it owns its own memory.
pub struct ChatEngine {
    rag: Arc<RagService>,
    llm: Arc<dyn LlmService>,
    settings: ChatSettings,
}

impl ChatEngine {
    pub fn new(rag: Arc<RagService>, llm: Arc<dyn LlmService>, settings: ChatSettings) -> Self {
        Self { rag, llm, settings }
    }

    pub fn new_session(self: &Arc<Self>) -> ChatSession {
        self.session_with_id(Uuid::new_v4())
    }

    pub fn session_with_id(self: &Arc<Self>, id: Uuid) -> ChatSession {
        ChatSession {
            id,
            engine: self.clone(),
            memory: Mutex::new(ChatMemory::new(self.settings.memory_token_limit)),
            responding: AtomicBool::new(false),
        }
    }

    pub fn rag(&self) -> &RagService {
        &self.rag
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    fn build_request(
        &self,
        message: &str,
        history: Vec<Message>,
        context: &[SearchResult],
    ) -> CompletionRequest {
        let context_block = self
            .settings
            .context_template
            .replace("{context}", &render_context(context));

        CompletionRequest {
            system: format!("{}\n{}", self.settings.system_prompt, context_block),
            history,
            message: message.to_string(),
        }
    }
}

fn render_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| match &r.chunk.metadata.file_name {
            Some(name) => format!("file_name: {name}\n\n{}", r.chunk.content),
            None => r.chunk.content.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Responding,
}

/// One conversational identity. Turns are serialized by the memory lock,
/// which is held for the whole turn. Reads of the history take the same lock
/// but do not make the session `Responding`.
pub struct ChatSession {
    id: Uuid,
    engine: Arc<ChatEngine>,
    memory: Mutex<ChatMemory>,
    responding: AtomicBool,
}

/// Clears the responding flag however the turn ends, including when the
/// caller drops the future.
struct RespondingGuard<'a>(&'a AtomicBool);

impl<'a> RespondingGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for RespondingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ChatSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        if self.responding.load(Ordering::Acquire) {
            SessionState::Responding
        } else {
            SessionState::Idle
        }
    }

    /// Answers one user message grounded in the index.
    ///
    /// Memory is only updated when the model returns; on timeout, model
    /// error or cancellation it is left exactly as it was.
    #[instrument(skip(self, message), fields(session_id = %self.id))]
    pub async fn respond(&self, message: &str) -> Result<String, DomainError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(DomainError::validation("message must not be empty"));
        }

        let mut memory = self.memory.lock().await;
        let _responding = RespondingGuard::enter(&self.responding);
        let settings = &self.engine.settings;

        let context = self.engine.rag.retrieve_top_k(message, settings.top_k).await?;
        let request = self.engine.build_request(message, memory.messages(), &context);
        tracing::debug!(
            retrieved = context.len(),
            history = request.history.len(),
            "generation request built"
        );

        let response = tokio::time::timeout(
            settings.response_timeout,
            self.engine.llm.complete(&request),
        )
        .await
        .map_err(|_| {
            DomainError::timeout(format!(
                "model did not answer within {:?}",
                settings.response_timeout
            ))
        })??;

        let evicted = memory.push(Turn::new(message, response.clone()));
        tracing::info!(
            turns = memory.len(),
            tokens = memory.token_count(),
            evicted,
            "turn completed"
        );

        Ok(response)
    }

    pub async fn turn_count(&self) -> usize {
        self.memory.lock().await.len()
    }

    pub async fn history(&self) -> Vec<Turn> {
        self.memory.lock().await.turns().cloned().collect()
    }

    pub async fn reset(&self) {
        self.memory.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::estimate_tokens;
    use crate::testing::{engine_with_corpus, EchoLlm, FailingLlm, StallingLlm};

    #[tokio::test]
    async fn test_request_includes_retrieved_document_text() {
        let llm = Arc::new(EchoLlm::default());
        let engine = engine_with_corpus(
            &["front brake pads wear every 20,000 miles"],
            llm.clone(),
            ChatSettings::default(),
        )
        .await;
        let session = engine.new_session();

        let response = session
            .respond("how often should I replace brake pads?")
            .await
            .unwrap();

        assert!(response.contains("front brake pads wear every 20,000 miles"));
        let request = llm.last_request().unwrap();
        assert!(request.system.starts_with("You are a chatbot"));
        assert!(request
            .system
            .contains("front brake pads wear every 20,000 miles"));
        assert!(request.system.contains("Context information is below."));
        assert_eq!(request.message, "how often should I replace brake pads?");
        assert!(request.history.is_empty());
    }

    #[tokio::test]
    async fn test_history_is_passed_oldest_first() {
        let llm = Arc::new(EchoLlm::default());
        let engine =
            engine_with_corpus(&["Check oil monthly."], llm.clone(), ChatSettings::default()).await;
        let session = engine.new_session();

        session.respond("first").await.unwrap();
        session.respond("second").await.unwrap();
        session.respond("third").await.unwrap();

        let request = llm.last_request().unwrap();
        assert_eq!(request.history.len(), 4);
        assert_eq!(request.history[0], Message::user("first"));
        assert_eq!(request.history[2], Message::user("second"));
        assert_eq!(session.turn_count().await, 3);
    }

    #[tokio::test]
    async fn test_timeout_leaves_memory_unchanged_and_session_usable() {
        let llm = Arc::new(StallingLlm::stall_first());
        let settings = ChatSettings::default().with_timeout(Duration::from_millis(50));
        let engine = engine_with_corpus(&["Check tyre pressure."], llm.clone(), settings).await;
        let session = engine.new_session();

        let before = session.turn_count().await;
        let err = session.respond("is my tyre flat?").await.unwrap_err();

        assert!(matches!(err, DomainError::Timeout(_)));
        assert_eq!(session.turn_count().await, before);
        assert_eq!(session.state(), SessionState::Idle);

        let response = session.respond("is my tyre flat?").await.unwrap();
        assert!(!response.is_empty());
        assert_eq!(session.turn_count().await, before + 1);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_model_error_leaves_memory_unchanged() {
        let engine = engine_with_corpus(
            &["Battery terminals corrode."],
            Arc::new(FailingLlm),
            ChatSettings::default(),
        )
        .await;
        let session = engine.new_session();

        let err = session.respond("why won't my car start?").await.unwrap_err();

        assert!(matches!(err, DomainError::ExternalService(_)));
        assert_eq!(session.turn_count().await, 0);
    }

    #[tokio::test]
    async fn test_empty_message_rejected_before_model_call() {
        let llm = Arc::new(EchoLlm::default());
        let engine =
            engine_with_corpus(&["Wipers."], llm.clone(), ChatSettings::default()).await;
        let session = engine.new_session();

        let err = session.respond("   ").await.unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
        assert!(llm.last_request().is_none());
    }

    #[tokio::test]
    async fn test_memory_stays_within_budget() {
        let llm = Arc::new(EchoLlm::default());
        let settings = ChatSettings::default().with_memory_limit(200);
        let engine = engine_with_corpus(&["Alternator belt."], llm.clone(), settings).await;
        let session = engine.new_session();

        for i in 0..10 {
            session.respond(&format!("question number {i}")).await.unwrap();
        }

        let history = session.history().await;
        assert!(history.len() < 10);
        assert!(history.last().unwrap().user.ends_with('9'));
        let memory_tokens: usize = history
            .iter()
            .map(|t| estimate_tokens(&t.user) + estimate_tokens(&t.assistant))
            .sum();
        assert!(memory_tokens <= 200);
    }

    #[tokio::test]
    async fn test_sessions_do_not_share_memory() {
        let llm = Arc::new(EchoLlm::default());
        let engine =
            engine_with_corpus(&["Headlights."], llm.clone(), ChatSettings::default()).await;
        let alice = engine.new_session();
        let bob = engine.new_session();

        alice.respond("my headlight is dim").await.unwrap();
        bob.respond("hello").await.unwrap();

        assert!(llm.last_request().unwrap().history.is_empty());
        assert_eq!(alice.turn_count().await, 1);
        assert_eq!(bob.turn_count().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_turns_are_serialized() {
        let llm = Arc::new(EchoLlm::default());
        let engine =
            engine_with_corpus(&["Horn."], llm.clone(), ChatSettings::default()).await;
        let session = Arc::new(engine.new_session());

        let a = tokio::spawn({
            let session = session.clone();
            async move { session.respond("one").await }
        });
        let b = tokio::spawn({
            let session = session.clone();
            async move { session.respond("two").await }
        });
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        // The later turn must have seen the earlier one in its history.
        let request = llm.last_request().unwrap();
        assert_eq!(request.history.len(), 2);
        assert_eq!(session.turn_count().await, 2);
    }

    #[tokio::test]
    async fn test_cancelled_turn_leaves_session_idle() {
        let llm = Arc::new(StallingLlm::stall_first());
        let engine =
            engine_with_corpus(&["Fuel pump."], llm.clone(), ChatSettings::default()).await;
        let session = engine.new_session();

        let turn = session.respond("does my fuel pump whine?");
        let _ = tokio::time::timeout(Duration::from_millis(20), turn).await;

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.turn_count().await, 0);
    }

    #[tokio::test]
    async fn test_state_tracks_turns_not_history_reads() {
        let llm = Arc::new(StallingLlm::stall_first());
        let engine =
            engine_with_corpus(&["Alternator belt."], llm.clone(), ChatSettings::default()).await;
        let session = Arc::new(engine.new_session());

        {
            let _reading = session.memory.lock().await;
            assert_eq!(session.state(), SessionState::Idle);
        }

        let turn = tokio::spawn({
            let session = session.clone();
            async move { session.respond("why does my belt squeal?").await }
        });
        while llm.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(session.state(), SessionState::Responding);

        turn.abort();
        let _ = turn.await;
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.turn_count().await, 0);
    }
}
