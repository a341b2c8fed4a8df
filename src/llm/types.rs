//! Common types for LLM interactions

use crate::transcript::{ConversationTurn, Role};

/// LLM request
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system: Option<String>,
    pub messages: Vec<LlmMessage>,
}

impl LlmRequest {
    /// Replay `history`, then append the new user message.
    pub fn from_history(
        system: impl Into<String>,
        history: &[ConversationTurn],
        message: impl Into<String>,
    ) -> Self {
        let mut messages: Vec<LlmMessage> = history
            .iter()
            .map(|turn| LlmMessage {
                role: match turn.role {
                    Role::User => MessageRole::User,
                    Role::Assistant => MessageRole::Assistant,
                },
                text: turn.text.clone(),
            })
            .collect();
        messages.push(LlmMessage::user(message));

        Self {
            system: Some(system.into()),
            messages,
        }
    }
}

/// Message in conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmMessage {
    pub role: MessageRole,
    pub text: String,
}

impl LlmMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            text: text.into(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

/// LLM response
#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    /// Text of the first candidate, if the provider produced any
    pub text: Option<String>,
    pub usage: Usage,
}

/// Token usage
#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
