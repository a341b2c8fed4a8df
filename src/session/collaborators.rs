//! Things the session talks to besides the chat backend

use crate::api::{CreateWebCallRequest, CreateWebCallResponse};
use crate::call::CallEvent;
use crate::transport::TransportError;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use tokio::sync::mpsc;

/// Issues voice-provider access tokens
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Create a web call for `agent_id` (the server default when `None`) and
    /// return its access token.
    async fn create_web_call(&self, agent_id: Option<&str>) -> Result<String, TransportError>;
}

/// Asks the backend's `/api/create-web-call` endpoint
pub struct HttpCredentialSource {
    client: Client,
    endpoint: String,
}

impl HttpCredentialSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl CredentialSource for HttpCredentialSource {
    async fn create_web_call(&self, agent_id: Option<&str>) -> Result<String, TransportError> {
        let request = CreateWebCallRequest {
            agent_id: agent_id.map(str::to_string),
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(TransportError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str::<CreateWebCallResponse>(&body)
            .map(|r| r.access_token)
            .map_err(|e| TransportError::Network(format!("Malformed credential response: {e}")))
    }
}

/// Notifications from the voice provider's client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    CallStarted,
    CallEnded,
    AgentStartTalking,
    AgentStopTalking,
    Error(String),
}

impl VoiceEvent {
    pub fn into_call_event(self) -> CallEvent {
        match self {
            VoiceEvent::CallStarted => CallEvent::CallStarted { at: Utc::now() },
            VoiceEvent::CallEnded => CallEvent::CallEnded,
            VoiceEvent::AgentStartTalking => CallEvent::AgentStartTalking,
            VoiceEvent::AgentStopTalking => CallEvent::AgentStopTalking,
            VoiceEvent::Error(message) => CallEvent::ProviderError { message },
        }
    }
}

/// Client side of the voice provider: starts and stops the audio call
#[async_trait]
pub trait VoiceClient: Send + Sync {
    async fn start_call(&self, access_token: &str) -> Result<(), String>;

    async fn stop_call(&self);

    /// Register where provider notifications go
    fn subscribe(&self, events: mpsc::UnboundedSender<VoiceEvent>);
}
