//! Portal failure classification.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("browser session is no longer alive")]
    Disconnected,

    #[error(transparent)]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("timed out after {waited:?} waiting for {what}")]
    Timeout { what: String, waited: Duration },

    #[error("could not extract {what} from the portal response")]
    Extraction { what: String },

    #[error("portal rejected the request: {0}")]
    Rejected(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PortalError {
    pub fn timeout(what: impl Into<String>, waited: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            waited,
        }
    }

    pub fn extraction(what: impl Into<String>) -> Self {
        Self::Extraction { what: what.into() }
    }

    /// True when the failure is a slow-or-unreachable portal rather than a
    /// hard rejection. These get "try again" wording and are never
    /// auto-retried.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Cdp(chromiumoxide::error::CdpError::Timeout)
        )
    }

    /// Friendly text for the conversational surface.
    pub fn user_message(&self) -> String {
        match self {
            Self::Timeout { .. } | Self::Cdp(chromiumoxide::error::CdpError::Timeout) => {
                "The voter portal is taking too long to respond. Please try again in a moment."
                    .to_string()
            }
            Self::Launch(_) | Self::Disconnected => {
                "Could not reach the voter portal right now. Please try again shortly.".to_string()
            }
            Self::Rejected(message) => message.clone(),
            Self::Extraction { what } => {
                format!("The portal responded but no {what} could be found in its reply.")
            }
            Self::Http(_) => {
                "The voter portal could not be contacted. Please try again shortly.".to_string()
            }
            _ => "Something went wrong while talking to the voter portal.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_classification() {
        let err = PortalError::timeout("#statusResponse", Duration::from_secs(20));
        assert!(err.is_timeout());
        assert!(err.user_message().contains("try again"));
    }

    #[test]
    fn rejection_passes_portal_text_through() {
        let err = PortalError::Rejected("Aadhaar already registered".to_string());
        assert!(!err.is_timeout());
        assert_eq!(err.user_message(), "Aadhaar already registered");
    }

    #[test]
    fn extraction_names_the_missing_thing() {
        let err = PortalError::extraction("application ID");
        assert!(err.user_message().contains("application ID"));
    }
}
