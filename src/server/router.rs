use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use super::state::AppState;

const MAX_MESSAGE_CHARS: usize = 5000;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/chat/message", post(chat_message_handler))
        .route("/chat/history/:user_id", get(chat_history_handler))
        .route("/chat/clear", post(chat_clear_handler))
        .route("/health", get(health_handler))
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatMessageRequest {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatClearRequest {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
}

fn bad_request(message: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "success": false,
            "message": message,
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
}

async fn chat_message_handler(
    State(state): State<AppState>,
    Json(req): Json<ChatMessageRequest>,
) -> impl IntoResponse {
    let message = match req.message.as_deref().map(str::trim) {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => {
            return bad_request("Message is required and must be a non-empty string.")
                .into_response()
        }
    };
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return bad_request("Message is too long. Maximum 5000 characters allowed.")
            .into_response();
    }

    let Some(user_id) = non_blank(req.user_id) else {
        return bad_request("userId and sessionId are required.").into_response();
    };
    let Some(session_id) = non_blank(req.session_id) else {
        return bad_request("userId and sessionId are required.").into_response();
    };
    info!(user = %user_id, session = %session_id, "chat message received");

    match state.agent.chat(&user_id, &session_id, &message).await {
        Ok(reply) => {
            let remembered = state.memory.memory(&user_id).remembered;
            Json(json!({
                "success": true,
                "message": reply,
                "userId": user_id,
                "sessionId": session_id,
                "userMemory": remembered,
                "timestamp": Utc::now().to_rfc3339(),
            }))
            .into_response()
        }
        Err(err) => {
            error!(user = %user_id, error = %err, "chat turn failed");
            let mut body = json!({
                "success": false,
                "message": "I apologize, but I encountered an error processing your request. Please try again.",
                "timestamp": Utc::now().to_rfc3339(),
            });
            if state.dev_mode {
                body["error"] = Value::String(err.to_string());
            }
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

async fn chat_history_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<Value> {
    let conversations = state.memory.conversations_for(&user_id);
    Json(json!({
        "success": true,
        "count": conversations.len(),
        "conversations": conversations,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn chat_clear_handler(
    State(state): State<AppState>,
    Json(req): Json<ChatClearRequest>,
) -> impl IntoResponse {
    let Some(user_id) = non_blank(req.user_id) else {
        return bad_request("userId is required.").into_response();
    };
    state.memory.clear(&user_id, req.session_id.as_deref());
    info!(user = %user_id, "conversation history cleared");
    Json(json!({
        "success": true,
        "message": "Conversation history cleared.",
        "timestamp": Utc::now().to_rfc3339(),
    }))
    .into_response()
}

async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let stats = state.memory.stats();
    Json(json!({
        "status": "ok",
        "uptimeSecs": state.uptime_secs(),
        "model": state.agent.model_name(),
        "portalLoggedIn": state.portal.is_logged_in().await,
        "memory": stats,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
