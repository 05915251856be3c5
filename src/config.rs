//! Process-level configuration for the voterflow server.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub const BIND_ENV: &str = "VOTERFLOW_BIND";
pub const STORAGE_DIR_ENV: &str = "VOTERFLOW_STORAGE_DIR";
pub const DEV_MODE_ENV: &str = "VOTERFLOW_DEV";

const DEFAULT_BIND: &str = "127.0.0.1:3001";

/// Server settings resolved from the environment, then overridable by
/// CLI flags. Portal-side settings live in `PortalConfig`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind: SocketAddr,
    /// Where memories and transcripts are persisted; `None` keeps them
    /// purely in memory.
    pub storage_dir: Option<PathBuf>,
    /// Attach error detail to HTTP responses.
    pub dev_mode: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let bind_raw = env::var(BIND_ENV).unwrap_or_else(|_| DEFAULT_BIND.to_string());
        let bind = bind_raw
            .parse()
            .with_context(|| format!("invalid {BIND_ENV} address: {bind_raw}"))?;
        let storage_dir = env::var(STORAGE_DIR_ENV).ok().map(PathBuf::from);
        let dev_mode = env::var(DEV_MODE_ENV)
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Ok(Self {
            bind,
            storage_dir,
            dev_mode,
        })
    }
}
