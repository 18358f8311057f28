use std::sync::Arc;

use crate::api::sessions::SessionStore;
use crate::application::ChatEngine;
use crate::infrastructure::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ChatEngine>,
    pub sessions: Arc<SessionStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(engine: Arc<ChatEngine>, config: AppConfig) -> Self {
        let sessions = Arc::new(SessionStore::new(
            engine.clone(),
            config.config.sessions.max_sessions,
        ));
        Self {
            engine,
            sessions,
            config: Arc::new(config),
        }
    }
}
