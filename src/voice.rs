//! Voice provider integration for the credential endpoint
//!
//! The backend never carries audio. It only exchanges its secret key for a
//! short-lived web-call access token that the browser hands to the voice SDK.

mod retell;

pub use retell::RetellService;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    /// The provider answered with a non-success status; `body` is verbatim.
    #[error("Voice provider returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Voice provider request failed: {0}")]
    Network(String),

    #[error("Unexpected voice provider response: {0}")]
    Decode(String),
}

/// A freshly created web call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebCall {
    pub access_token: String,
    pub call_id: Option<String>,
}

/// Creates web calls on the voice provider
#[async_trait]
pub trait WebCallService: Send + Sync {
    async fn create_web_call(&self, agent_id: &str) -> Result<WebCall, VoiceError>;
}

/// Logging wrapper for web call services
pub struct LoggingWebCallService {
    inner: Arc<dyn WebCallService>,
}

impl LoggingWebCallService {
    pub fn new(inner: Arc<dyn WebCallService>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl WebCallService for LoggingWebCallService {
    async fn create_web_call(&self, agent_id: &str) -> Result<WebCall, VoiceError> {
        let start = std::time::Instant::now();
        let result = self.inner.create_web_call(agent_id).await;
        let duration = start.elapsed();

        match &result {
            Ok(call) => tracing::info!(
                agent_id,
                call_id = ?call.call_id,
                duration_ms = %duration.as_millis(),
                "Web call created"
            ),
            Err(e) => tracing::error!(
                agent_id,
                duration_ms = %duration.as_millis(),
                error = %e,
                "Web call creation failed"
            ),
        }

        result
    }
}
