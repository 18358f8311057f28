use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Continues an earlier conversation; a new one is started when absent.
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: Uuid,
}

pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload?;
    let session = state.sessions.get_or_create(request.session_id)?;

    let response = session.respond(&request.message).await?;

    Ok(Json(ChatResponse {
        response,
        session_id: session.id(),
    }))
}
