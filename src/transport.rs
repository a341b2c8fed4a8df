//! Chat transports
//!
//! The conversation controller talks to whichever assistant backend is in use
//! through [`ChatBackend`]: a direct request/response API, or the embedded
//! third-party widget driven by [`crate::widget::WidgetBridge`].

mod direct;

pub use direct::DirectChatBackend;

use crate::transcript::ConversationTurn;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Where asynchronously observed replies are delivered
pub type ReplySink = mpsc::UnboundedSender<String>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The backend answered with a non-success status. `body` is verbatim.
    #[error("Backend returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The request could not complete at all
    #[error("Request failed: {0}")]
    Network(String),

    /// The embedded widget was never found or cannot be operated
    #[error("Chat widget unavailable: {0}")]
    WidgetUnavailable(String),
}

/// How the answer to a `send` will arrive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The reply came back with the request
    Reply(String),
    /// The reply will show up later on the sink given to `on_reply`
    Pending,
}

/// A backend the conversation controller can chat through
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Prepare the backend for sending. Idempotent.
    async fn open(&self) -> Result<(), TransportError>;

    /// Send one user utterance. `prior` is the transcript before it.
    async fn send(
        &self,
        utterance: &str,
        prior: &[ConversationTurn],
    ) -> Result<Delivery, TransportError>;

    /// Register where replies that arrive outside a `send` go.
    fn on_reply(&self, sink: ReplySink);
}
