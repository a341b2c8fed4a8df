//! HTTP API: the two proxy endpoints the page calls

mod handlers;
mod types;

pub use handlers::create_router;
pub use types::*;

use crate::llm::LlmService;
use crate::voice::WebCallService;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub llm: Arc<dyn LlmService>,
    pub voice: Arc<dyn WebCallService>,
    /// Agent used when the page does not send one
    pub default_agent_id: Arc<str>,
}

impl AppState {
    pub fn new(
        llm: Arc<dyn LlmService>,
        voice: Arc<dyn WebCallService>,
        default_agent_id: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            llm,
            voice,
            default_agent_id: default_agent_id.into(),
        }
    }
}
