//! Direct request/response transport against the chat endpoint

use super::{ChatBackend, Delivery, ReplySink, TransportError};
use crate::api::{ChatRequest, HistoryEntry};
use crate::persona::FALLBACK_REPLY;
use crate::transcript::ConversationTurn;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// Sends every utterance as one `POST` carrying the replayed history.
pub struct DirectChatBackend {
    client: Client,
    endpoint: String,
}

impl DirectChatBackend {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    fn build_request(utterance: &str, prior: &[ConversationTurn]) -> ChatRequest {
        ChatRequest {
            message: Some(utterance.to_string()),
            history: prior.iter().map(HistoryEntry::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    reply: Option<String>,
}

#[async_trait]
impl ChatBackend for DirectChatBackend {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn open(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send(
        &self,
        utterance: &str,
        prior: &[ConversationTurn],
    ) -> Result<Delivery, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&Self::build_request(utterance, prior))
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

        let reply = match serde_json::from_str::<ChatReply>(&body) {
            Ok(ChatReply { reply: Some(text) }) if !text.is_empty() => text,
            Ok(_) => FALLBACK_REPLY.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Chat endpoint returned an unreadable body");
                FALLBACK_REPLY.to_string()
            }
        };

        Ok(Delivery::Reply(reply))
    }

    fn on_reply(&self, _sink: ReplySink) {
        // Replies always come back on the request itself
    }
}
