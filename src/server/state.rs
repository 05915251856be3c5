use std::sync::Arc;
use std::time::Instant;

use voterflow_agent_core::ChatAgent;
use voterflow_memory_center::SharedMemoryCenter;
use voterflow_portal_adapter::SharedPortal;

/// Shared handles behind every route.
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<ChatAgent>,
    pub memory: SharedMemoryCenter,
    pub portal: SharedPortal,
    pub started_at: Instant,
    pub dev_mode: bool,
}

impl AppState {
    pub fn new(
        agent: Arc<ChatAgent>,
        memory: SharedMemoryCenter,
        portal: SharedPortal,
        dev_mode: bool,
    ) -> Self {
        Self {
            agent,
            memory,
            portal,
            started_at: Instant::now(),
            dev_mode,
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
