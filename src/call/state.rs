//! Call session state types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a single voice call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    #[default]
    Idle,
    Connecting,
    Active,
    Ended,
    Failed,
}

impl CallState {
    pub fn as_str(self) -> &'static str {
        match self {
            CallState::Idle => "idle",
            CallState::Connecting => "connecting",
            CallState::Active => "active",
            CallState::Ended => "ended",
            CallState::Failed => "failed",
        }
    }
}

/// The one call a page session can have at a time
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CallSession {
    pub state: CallState,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: u32,
    /// Incremented on every start; timer events carry the attempt they were
    /// scheduled for so late ones from a previous call are dropped.
    pub attempt: u32,
}

impl CallSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.state == CallState::Idle
    }

    pub fn is_active(&self) -> bool {
        self.state == CallState::Active
    }

    pub(crate) fn with_state(&self, state: CallState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    pub fn elapsed_display(&self) -> String {
        format_elapsed(self.elapsed_seconds)
    }
}

/// Format a second count as `MM:SS`.
pub fn format_elapsed(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
