//! HTTP 接口（axum）
//!
//! - POST /api/chat：{session_id?, message, history} -> {session_id, reply, closed}
//! - GET  /api/welcome：人设名与欢迎语
//! - GET  /health：存活探针

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::agent::AgentComponents;
use crate::chat::{ConversationLoop, HistoryEntry};

/// 路由共享状态
#[derive(Clone)]
pub struct AppState {
    pub conversation: Arc<ConversationLoop>,
    pub persona_name: String,
    pub welcome_message: String,
}

impl From<AgentComponents> for AppState {
    fn from(components: AgentComponents) -> Self {
        Self {
            conversation: components.conversation,
            persona_name: components.persona_name,
            welcome_message: components.welcome_message,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub reply: String,
    pub closed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WelcomeResponse {
    pub name: String,
    pub message: String,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(api_chat))
        .route("/api/welcome", get(api_welcome))
        .route("/health", get(|| async { "OK" }))
        .with_state(Arc::new(state))
}

async fn api_chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "message is required".to_string()));
    }

    if let Some(entry) = req.history.iter().find(|e| !e.is_conversational()) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!(
                "history entries must have role user or assistant, got {:?}",
                entry.role
            ),
        ));
    }

    let session_id = req
        .session_id
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let outcome = state
        .conversation
        .handle_turn_detailed(&session_id, message, req.history)
        .await;

    Ok(Json(ChatResponse {
        session_id,
        reply: outcome.reply,
        closed: outcome.closed,
    }))
}

async fn api_welcome(State(state): State<Arc<AppState>>) -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        name: state.persona_name.clone(),
        message: state.welcome_message.clone(),
    })
}
