//! Conversational agent core.
//!
//! Ties the pieces together: extracts form data from user messages, calls
//! the model with the portal function declarations, dispatches function
//! calls against the portal, and keeps per-user memory current.

pub mod chat;
pub mod errors;
pub mod functions;
pub mod gemini;
pub mod prompt;
pub mod provider;

pub use chat::ChatAgent;
pub use errors::AgentError;
pub use gemini::GeminiProvider;
pub use provider::{
    FunctionCall, LlmProvider, LlmRequest, LlmResponse, MockLlmProvider, Turn, TurnPart, TurnRole,
};
