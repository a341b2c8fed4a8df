//! Effects produced by call state transitions

use std::time::Duration;

/// Effects to be executed after a call transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEffect {
    /// Show or hide the call modal
    ShowCallUi,
    HideCallUi,

    /// Presentational updates
    SetStatus(&'static str),
    RenderTimer(String),
    SetSpeaking(bool),

    /// Ask the credential endpoint for a provider access token
    RequestCredential { attempt: u32 },

    /// Hand the credential to the voice provider
    StartProviderCall { access_token: String },

    /// Tell the voice provider to hang up
    StopProviderCall,

    /// Start the once-per-second elapsed counter
    StartTicker { attempt: u32 },
    StopTicker,

    /// Return to idle after the status has been on screen for a while
    ScheduleReset { delay: Duration, attempt: u32 },
}

impl CallEffect {
    pub fn render_timer(seconds: u32) -> Self {
        CallEffect::RenderTimer(super::format_elapsed(seconds))
    }
}
