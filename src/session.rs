//! Conversation session: the controller behind the site's chat popup
//!
//! One [`SessionRuntime`] exists per page session. It owns the transcript,
//! the call session and the popup flags, and is the only thing that mutates
//! them. Everything else (user actions, chat replies, voice provider
//! notifications, timers) reaches it as a [`SessionEvent`].

mod collaborators;
mod runtime;
mod surface;

#[cfg(test)]
pub mod testing;

pub use collaborators::{CredentialSource, HttpCredentialSource, VoiceClient, VoiceEvent};
pub use runtime::{SessionClosed, SessionHandle, SessionRuntime, SessionSnapshot};
pub use surface::{MessageKind, TracingSurface, UiSurface};

use crate::call::CallEvent;
use crate::transport::TransportError;
use std::time::Duration;

/// How the visitor chose to talk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Chat,
    Talk,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Agent to request calls for; the server default when `None`
    pub agent_id: Option<String>,
    /// Wait before apologising for an unavailable widget
    pub fallback_delay: Duration,
    pub tick_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            agent_id: None,
            fallback_delay: Duration::from_secs(1),
            tick_interval: Duration::from_secs(1),
        }
    }
}

/// Input to the session runtime
#[derive(Debug)]
pub enum SessionEvent {
    OpenPopup,
    ClosePopup,
    SelectChannel(Channel),
    SubmitUserMessage(String),

    /// An assistant reply, from a `send` or observed later
    ReplyReceived(String),
    TransportFailed(TransportError),
    /// Time to show the unavailable-widget apology
    FallbackDue,

    /// Outcome of a credential request made for call `attempt`
    Credential {
        attempt: u32,
        outcome: Result<String, String>,
    },
    Call(CallEvent),

    Snapshot(tokio::sync::oneshot::Sender<SessionSnapshot>),
}
