//! HTTP surface tests against an offline agent (mock model, stub portal).

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use voterflow_agent_core::{ChatAgent, MockLlmProvider};
use voterflow_core_types::{
    LoginOutcome, RegistrationOutcome, RegistrationPayload, SearchOutcome, StatusOutcome,
};
use voterflow_memory_center::{MemoryCenter, SharedMemoryCenter};
use voterflow_portal_adapter::{Portal, SharedPortal};
use voterflow_server::{build_router, AppState};

struct StubPortal;

#[async_trait]
impl Portal for StubPortal {
    async fn login_or_signup(&self, _: &str, _: &str, _: &str) -> LoginOutcome {
        LoginOutcome::failed("portal offline")
    }

    async fn submit_registration(&self, _: &RegistrationPayload) -> RegistrationOutcome {
        RegistrationOutcome::failed("portal offline")
    }

    async fn check_status(&self, _: &str) -> StatusOutcome {
        StatusOutcome::failed("portal offline")
    }

    async fn search_voter(&self, _: &str) -> SearchOutcome {
        SearchOutcome::failed("portal offline")
    }

    async fn is_logged_in(&self) -> bool {
        false
    }

    async fn close(&self) {}
}

fn test_router() -> (Router, SharedMemoryCenter) {
    let memory: SharedMemoryCenter = Arc::new(MemoryCenter::new());
    let portal: SharedPortal = Arc::new(StubPortal);
    let agent = Arc::new(ChatAgent::new(
        Arc::clone(&portal),
        Arc::new(MockLlmProvider),
        Arc::clone(&memory),
    ));
    let state = AppState::new(agent, Arc::clone(&memory), portal, false);
    (build_router(state), memory)
}

async fn send_json(router: Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap();
    (status, value)
}

async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap();
    (status, value)
}

#[tokio::test]
async fn missing_message_is_rejected() {
    let (router, _) = test_router();
    let (status, body) = send_json(router, "POST", "/chat/message", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(body["message"].as_str().unwrap().contains("required"));
}

#[tokio::test]
async fn blank_message_is_rejected() {
    let (router, _) = test_router();
    let (status, body) =
        send_json(router, "POST", "/chat/message", json!({ "message": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn missing_ids_are_rejected() {
    let (router, memory) = test_router();
    let (status, body) = send_json(
        router.clone(),
        "POST",
        "/chat/message",
        json!({ "message": "hello there" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(body["message"].as_str().unwrap().contains("userId"));
    // Nothing was chatted or persisted for the rejected request.
    assert_eq!(memory.stats().sessions, 0);

    let (status, _) = send_json(
        router,
        "POST",
        "/chat/message",
        json!({ "message": "hello there", "userId": "u1", "sessionId": "  " }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn clear_without_user_id_is_rejected() {
    let (router, _) = test_router();
    let (status, body) = send_json(router, "POST", "/chat/clear", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(body["message"].as_str().unwrap().contains("userId"));
}

#[tokio::test]
async fn overlong_message_is_rejected() {
    let (router, _) = test_router();
    let long = "a".repeat(5001);
    let (status, body) =
        send_json(router, "POST", "/chat/message", json!({ "message": long })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("5000"));
}

#[tokio::test]
async fn chat_turn_replies_and_remembers() {
    let (router, memory) = test_router();
    let (status, body) = send_json(
        router,
        "POST",
        "/chat/message",
        json!({
            "message": "my email is ravi@example.com",
            "userId": "u1",
            "sessionId": "s1",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert!(body["message"].as_str().unwrap().contains("ravi@example.com"));
    assert_eq!(body["userId"], json!("u1"));
    assert_eq!(body["userMemory"]["email"], json!("ravi@example.com"));
    assert_eq!(memory.history("s1").len(), 2);
}

#[tokio::test]
async fn history_lists_sessions_for_user() {
    let (router, _memory) = test_router();
    let (status, _) = send_json(
        router.clone(),
        "POST",
        "/chat/message",
        json!({ "message": "hello", "userId": "u2", "sessionId": "s2" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get_json(router, "/chat/history/u2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["conversations"][0]["sessionId"], json!("s2"));
}

#[tokio::test]
async fn clear_removes_conversations() {
    let (router, memory) = test_router();
    send_json(
        router.clone(),
        "POST",
        "/chat/message",
        json!({ "message": "hello", "userId": "u3", "sessionId": "s3" }),
    )
    .await;
    assert!(!memory.history("s3").is_empty());

    let (status, body) =
        send_json(router, "POST", "/chat/clear", json!({ "userId": "u3" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert!(memory.history("s3").is_empty());
}

#[tokio::test]
async fn health_reports_model_and_login_state() {
    let (router, _) = test_router();
    let (status, body) = get_json(router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["model"], json!("mock"));
    assert_eq!(body["portalLoggedIn"], json!(false));
}
