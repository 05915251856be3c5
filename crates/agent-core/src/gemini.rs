//! Gemini REST provider.
//!
//! Talks to the generativelanguage HTTP API directly; no vendor SDK.

use std::env;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::errors::AgentError;
use crate::functions::function_declarations;
use crate::provider::{FunctionCall, LlmProvider, LlmRequest, LlmResponse, Turn, TurnPart, TurnRole};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Reads `GEMINI_API_KEY` and optional `GEMINI_MODEL`.
    pub fn from_env() -> Result<Self, AgentError> {
        let api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| AgentError::invalid_request("GEMINI_API_KEY is not set"))?;
        let model = env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());
        Ok(Self::new(api_key, model))
    }

    fn build_body(request: &LlmRequest) -> GenerateContentRequest {
        let contents = request.turns.iter().map(content_from_turn).collect();
        let system_instruction = Some(SystemInstruction {
            parts: vec![Part::text(&request.system_prompt)],
        });
        let tools = request.tools_enabled.then(|| {
            vec![Tool {
                function_declarations: function_declarations(),
            }]
        });
        GenerateContentRequest {
            contents,
            system_instruction,
            tools,
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, AgentError> {
        let url = format!(
            "{BASE_URL}/{model}:generateContent?key={key}",
            model = self.model,
            key = self.api_key
        );
        let body = Self::build_body(request);

        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let candidate = parsed
            .candidates
            .and_then(|mut candidates| {
                if candidates.is_empty() {
                    None
                } else {
                    Some(candidates.remove(0))
                }
            })
            .and_then(|candidate| candidate.content)
            .ok_or(AgentError::EmptyResponse)?;

        let mut text_parts = Vec::new();
        let mut calls = Vec::new();
        for part in candidate.parts {
            if let Some(text) = part.text {
                text_parts.push(text);
            }
            if let Some(call) = part.function_call {
                calls.push(FunctionCall {
                    name: call.name,
                    args: call.args.unwrap_or(Value::Object(Default::default())),
                });
            }
        }
        debug!(
            texts = text_parts.len(),
            calls = calls.len(),
            "gemini response parsed"
        );

        Ok(LlmResponse {
            text: text_parts.join(" "),
            calls,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn content_from_turn(turn: &Turn) -> Content {
    let role = match turn.role {
        TurnRole::User => "user",
        TurnRole::Model => "model",
    };
    let parts = turn
        .parts
        .iter()
        .map(|part| match part {
            TurnPart::Text(text) => Part::text(text),
            TurnPart::Call(call) => Part {
                text: None,
                function_call: Some(FunctionCallPayload {
                    name: call.name.clone(),
                    args: Some(call.args.clone()),
                }),
            },
        })
        .collect();
    Content {
        role: role.to_string(),
        parts,
    }
}

fn map_http_error(status: StatusCode, body: String) -> AgentError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.clone());

    let retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );
    AgentError::upstream(Some(status.as_u16()), message, retryable)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    function_declarations: Value,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "functionCall", skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCallPayload>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            function_call: None,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct FunctionCallPayload {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    args: Option<Value>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape_with_tools() {
        let request = LlmRequest {
            system_prompt: "be helpful".to_string(),
            turns: vec![Turn::user("hello")],
            tools_enabled: true,
        };
        let body = serde_json::to_value(GeminiProvider::build_body(&request)).unwrap();
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be helpful");
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["name"],
            "autoSignupAndLogin"
        );
    }

    #[test]
    fn tools_omitted_when_disabled() {
        let request = LlmRequest {
            system_prompt: String::new(),
            turns: vec![Turn::user("hi")],
            tools_enabled: false,
        };
        let body = serde_json::to_value(GeminiProvider::build_body(&request)).unwrap();
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn function_call_turn_round_trips_to_parts() {
        let call = FunctionCall {
            name: "searchVoter".to_string(),
            args: serde_json::json!({ "voterId": "VOT123456" }),
        };
        let content = content_from_turn(&Turn::model_calls(vec![call]));
        let value = serde_json::to_value(&content.parts).unwrap();
        assert_eq!(value[0]["functionCall"]["name"], "searchVoter");
        assert_eq!(value[0]["functionCall"]["args"]["voterId"], "VOT123456");
    }

    #[test]
    fn http_error_mapping_marks_5xx_retryable() {
        let err = map_http_error(
            StatusCode::SERVICE_UNAVAILABLE,
            r#"{"error":{"message":"overloaded","status":"UNAVAILABLE"}}"#.to_string(),
        );
        assert!(err.is_retryable());
        assert!(err.to_string().contains("UNAVAILABLE"));
    }

    #[test]
    fn response_parsing_extracts_calls() {
        let raw = r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "Let me do that." },
                        { "functionCall": { "name": "checkApplicationStatus",
                                            "args": { "applicationId": "APP1X2" } } }
                    ]
                }
            }]
        }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let content = parsed.candidates.unwrap().remove(0).content.unwrap();
        assert_eq!(content.parts.len(), 2);
        let call = content.parts[1].function_call.as_ref().unwrap();
        assert_eq!(call.name, "checkApplicationStatus");
    }
}
