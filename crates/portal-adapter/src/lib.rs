//! Scripted automation against the voter registration portal.
//!
//! The portal is a fixed single-page app; every operation here drives it
//! through a known DOM contract (`selectors`) over one shared Chromium
//! session. Operations never surface raw automation errors: failures are
//! classified into user-facing outcome messages and the page state is
//! captured for diagnostics.

pub mod config;
pub mod error;
pub mod extract;
pub mod selectors;
pub mod session;

pub use config::PortalConfig;
pub use error::PortalError;
pub use session::{Portal, PortalSession, SharedPortal};
