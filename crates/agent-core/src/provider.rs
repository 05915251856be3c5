//! Abstraction over LLM back-ends so vendors can plug into the agent core.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AgentError;

/// A function the model asked the agent to run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub args: Value,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TurnRole {
    User,
    Model,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TurnPart {
    Text(String),
    Call(FunctionCall),
}

/// One conversation turn as sent to the model.
#[derive(Clone, Debug, PartialEq)]
pub struct Turn {
    pub role: TurnRole,
    pub parts: Vec<TurnPart>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            parts: vec![TurnPart::Text(text.into())],
        }
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            parts: vec![TurnPart::Text(text.into())],
        }
    }

    /// The model's own function-call turn, echoed back ahead of the
    /// function results.
    pub fn model_calls(calls: Vec<FunctionCall>) -> Self {
        Self {
            role: TurnRole::Model,
            parts: calls.into_iter().map(TurnPart::Call).collect(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LlmRequest {
    pub system_prompt: String,
    pub turns: Vec<Turn>,
    pub tools_enabled: bool,
}

#[derive(Clone, Debug, Default)]
pub struct LlmResponse {
    pub text: String,
    pub calls: Vec<FunctionCall>,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, AgentError>;

    /// Model identifier for health reporting.
    fn model_name(&self) -> &str;
}

/// Deterministic provider for tests and offline development. Echoes the
/// last user turn and never calls functions.
#[derive(Debug, Default, Clone)]
pub struct MockLlmProvider;

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, AgentError> {
        let last_user = request
            .turns
            .iter()
            .rev()
            .find(|turn| turn.role == TurnRole::User)
            .and_then(|turn| {
                turn.parts.iter().find_map(|part| match part {
                    TurnPart::Text(text) => Some(text.clone()),
                    TurnPart::Call(_) => None,
                })
            })
            .ok_or(AgentError::EmptyResponse)?;
        Ok(LlmResponse {
            text: format!("(offline) I received: {last_user}"),
            calls: Vec::new(),
        })
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_echoes_last_user_turn() {
        let provider = MockLlmProvider;
        let request = LlmRequest {
            system_prompt: String::new(),
            turns: vec![
                Turn::user("first"),
                Turn::model_text("reply"),
                Turn::user("second"),
            ],
            tools_enabled: true,
        };
        let response = provider.generate(&request).await.unwrap();
        assert!(response.text.contains("second"));
        assert!(response.calls.is_empty());
    }
}
