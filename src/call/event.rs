//! Events that drive a call session

use chrono::{DateTime, Utc};

/// Events that trigger call state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    // User events
    StartRequested,
    HangUp,
    /// The call UI was closed from outside (backdrop click)
    Dismiss,

    // Credential endpoint
    CredentialIssued {
        access_token: String,
    },
    CredentialFailed {
        reason: String,
    },

    // Voice provider events
    CallStarted {
        at: DateTime<Utc>,
    },
    CallEnded,
    AgentStartTalking,
    AgentStopTalking,
    ProviderError {
        message: String,
    },

    // Timers
    Tick {
        attempt: u32,
    },
    ResetDue {
        attempt: u32,
    },
}

impl CallEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CallEvent::StartRequested => "start_requested",
            CallEvent::HangUp => "hang_up",
            CallEvent::Dismiss => "dismiss",
            CallEvent::CredentialIssued { .. } => "credential_issued",
            CallEvent::CredentialFailed { .. } => "credential_failed",
            CallEvent::CallStarted { .. } => "call_started",
            CallEvent::CallEnded => "call_ended",
            CallEvent::AgentStartTalking => "agent_start_talking",
            CallEvent::AgentStopTalking => "agent_stop_talking",
            CallEvent::ProviderError { .. } => "error",
            CallEvent::Tick { .. } => "tick",
            CallEvent::ResetDue { .. } => "reset_due",
        }
    }
}
