use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use uuid::Uuid;

use crate::application::{ChatEngine, ChatSession};
use crate::domain::DomainError;

struct Entry {
    session: Arc<ChatSession>,
    last_used: Instant,
}

/// Chat sessions keyed by caller-held id, each with its own memory.
///
/// The map lock is only held for lookups; turns run under the session's
/// own lock. When full, the least recently used session is dropped.
pub struct SessionStore {
    engine: Arc<ChatEngine>,
    sessions: Mutex<HashMap<Uuid, Entry>>,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(engine: Arc<ChatEngine>, max_sessions: usize) -> Self {
        Self {
            engine,
            sessions: Mutex::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
        }
    }

    /// Returns the session for `id`, creating it when `id` is absent or unknown.
    pub fn get_or_create(&self, id: Option<Uuid>) -> Result<Arc<ChatSession>, DomainError> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        let id = id.unwrap_or_else(Uuid::new_v4);

        if let Some(entry) = sessions.get_mut(&id) {
            entry.last_used = Instant::now();
            return Ok(entry.session.clone());
        }

        if sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| *id);
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                tracing::info!(session_id = %oldest, "evicted least recently used session");
            }
        }

        let session = Arc::new(self.engine.session_with_id(id));
        sessions.insert(
            id,
            Entry {
                session: session.clone(),
                last_used: Instant::now(),
            },
        );
        tracing::debug!(session_id = %id, "session created");
        Ok(session)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ChatSettings;
    use crate::testing::{engine_with_corpus, EchoLlm};

    async fn store(max: usize) -> SessionStore {
        let engine = engine_with_corpus(
            &["Timing belt."],
            Arc::new(EchoLlm::default()),
            ChatSettings::default(),
        )
        .await;
        SessionStore::new(engine, max)
    }

    #[tokio::test]
    async fn test_same_id_returns_same_session() {
        let store = store(4).await;
        let first = store.get_or_create(None).unwrap();

        let again = store.get_or_create(Some(first.id())).unwrap();

        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_id_is_adopted() {
        let store = store(4).await;
        let id = Uuid::new_v4();

        let session = store.get_or_create(Some(id)).unwrap();

        assert_eq!(session.id(), id);
    }

    #[tokio::test]
    async fn test_least_recently_used_evicted_when_full() {
        let store = store(2).await;
        let a = store.get_or_create(None).unwrap().id();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = store.get_or_create(None).unwrap().id();
        std::thread::sleep(std::time::Duration::from_millis(2));
        store.get_or_create(Some(a)).unwrap();

        store.get_or_create(None).unwrap();

        assert_eq!(store.len(), 2);
        let sessions = store.sessions.lock().unwrap();
        assert!(sessions.contains_key(&a));
        assert!(!sessions.contains_key(&b));
    }
}
