//! Agent error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model request failed: {message}")]
    Upstream {
        status: Option<u16>,
        message: String,
        retryable: bool,
    },

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AgentError {
    pub fn upstream(status: Option<u16>, message: impl Into<String>, retryable: bool) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
            retryable,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream { retryable, .. } => *retryable,
            Self::Http(err) => err.is_connect() || err.is_timeout(),
            _ => false,
        }
    }
}
