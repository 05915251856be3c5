//! Voterflow server: HTTP surface over the conversational agent that
//! drives a voter registration portal through a scripted browser session.
//!
//! The heavy lifting lives in the workspace crates; this crate wires an
//! axum router, process configuration, and the serve entrypoint around
//! them.

pub mod config;
pub mod server;

pub use config::AppConfig;
pub use server::{build_router, AppState};

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use voterflow_agent_core::{ChatAgent, GeminiProvider, LlmProvider, MockLlmProvider};
use voterflow_memory_center::MemoryCenter;
use voterflow_portal_adapter::{PortalConfig, PortalSession};

/// Assemble the full application state from configuration.
///
/// Falls back to the offline mock provider when no Gemini key is
/// configured, so the server still answers without a portal or an API key.
pub fn build_state(config: &AppConfig, portal_config: PortalConfig) -> Result<AppState> {
    let memory = match &config.storage_dir {
        Some(dir) => Arc::new(MemoryCenter::with_persistence(dir)?),
        None => Arc::new(MemoryCenter::new()),
    };

    let provider: Arc<dyn LlmProvider> = match GeminiProvider::from_env() {
        Ok(gemini) => {
            info!(model = gemini.model_name(), "using Gemini provider");
            Arc::new(gemini)
        }
        Err(err) => {
            warn!(error = %err, "Gemini unavailable, using offline mock provider");
            Arc::new(MockLlmProvider)
        }
    };

    let portal: voterflow_portal_adapter::SharedPortal = Arc::new(PortalSession::new(portal_config));
    let agent = Arc::new(ChatAgent::new(
        Arc::clone(&portal),
        provider,
        Arc::clone(&memory),
    ));

    Ok(AppState::new(agent, memory, portal, config.dev_mode))
}
