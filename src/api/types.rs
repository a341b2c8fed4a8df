//! API request and response types

use crate::transcript::{ConversationTurn, Role};
use serde::{Deserialize, Serialize};

/// Request to create a web call
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CreateWebCallRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

/// Response carrying the voice provider's access token
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateWebCallResponse {
    pub access_token: String,
}

/// Request to send a chat message
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// One prior turn as the page sends it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    #[serde(default)]
    pub text: String,
}

impl HistoryEntry {
    /// Anything that is not literally "user" is replayed as the assistant.
    pub fn to_turn(&self) -> ConversationTurn {
        let role = if self.role == "user" {
            Role::User
        } else {
            Role::Assistant
        };
        ConversationTurn {
            role,
            text: self.text.clone(),
        }
    }
}

impl From<&ConversationTurn> for HistoryEntry {
    fn from(turn: &ConversationTurn) -> Self {
        Self {
            role: match turn.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            }
            .to_string(),
            text: turn.text.clone(),
        }
    }
}

/// Chat reply
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// Error body used by every failure response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
