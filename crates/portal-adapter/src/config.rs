//! Portal session configuration, resolved from the environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORTAL_URL: &str = "http://localhost:5000";

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Tunables for the browser session and its waits.
///
/// The wait values mirror how the portal actually behaves: it renders
/// responses asynchronously into `*Response` panels, so submits are
/// followed by settle delays and bounded polls rather than navigation
/// events.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub base_url: String,
    pub headless: bool,
    pub viewport: (u32, u32),
    pub user_agent: String,
    /// Hard ceiling on any single portal operation.
    pub op_timeout: Duration,
    /// Poll bound for an element to appear.
    pub element_wait: Duration,
    /// Poll bound for a response panel to be shown after a submit.
    pub response_wait: Duration,
    /// Poll bound for the OTP panel during signup.
    pub otp_wait: Duration,
    pub settle_after_nav: Duration,
    pub settle_after_submit: Duration,
    pub screenshot_dir: PathBuf,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: env_or("VOTER_PORTAL_URL", DEFAULT_PORTAL_URL),
            headless: env_flag("VOTERFLOW_HEADLESS", true),
            viewport: (1280, 720),
            user_agent: USER_AGENT.to_string(),
            op_timeout: Duration::from_secs(60),
            element_wait: Duration::from_secs(10),
            response_wait: Duration::from_secs(20),
            otp_wait: Duration::from_secs(15),
            settle_after_nav: Duration::from_secs(2),
            settle_after_submit: Duration::from_secs(3),
            screenshot_dir: PathBuf::from(env_or("VOTERFLOW_SCREENSHOT_DIR", "screenshots")),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.trim(), "1" | "true" | "TRUE" | "yes" | "on"),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = PortalConfig::default();
        assert!(config.base_url.starts_with("http"));
        assert_eq!(config.viewport, (1280, 720));
        assert!(config.element_wait < config.op_timeout);
        assert!(config.response_wait <= config.op_timeout);
    }
}
