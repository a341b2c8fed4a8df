//! Pure call state transition function

use super::{CallEffect, CallEvent, CallSession, CallState};
use crate::persona::{
    STATUS_CALL_ENDED, STATUS_CALL_ERROR, STATUS_CONNECTING, STATUS_CONNECTION_FAILED,
    STATUS_SPEAKING,
};
use std::time::Duration;
use thiserror::Error;

/// How long "Call ended" stays on screen before the modal closes
pub const ENDED_DISPLAY_DELAY: Duration = Duration::from_millis(1500);

/// How long a failure status stays on screen before the modal closes
pub const FAILED_DISPLAY_DELAY: Duration = Duration::from_millis(2000);

/// Result of a call transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_session: CallSession,
    pub effects: Vec<CallEffect>,
}

impl TransitionResult {
    pub fn new(session: CallSession) -> Self {
        Self {
            new_session: session,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: CallEffect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = CallEffect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during a call transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A call is already in progress ({0})")]
    CallInProgress(&'static str),
    #[error("Invalid transition: {event} while {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },
}

/// Pure transition function.
///
/// Given the same session and event it always produces the same result and
/// performs no I/O.
pub fn transition(
    session: &CallSession,
    event: CallEvent,
) -> Result<TransitionResult, TransitionError> {
    match (session.state, event) {
        // ============================================================
        // Starting a call
        // ============================================================
        (CallState::Idle, CallEvent::StartRequested) => {
            let attempt = session.attempt.wrapping_add(1);
            let next = CallSession {
                state: CallState::Connecting,
                started_at: None,
                elapsed_seconds: 0,
                attempt,
            };
            Ok(TransitionResult::new(next)
                .with_effect(CallEffect::ShowCallUi)
                .with_effect(CallEffect::SetStatus(STATUS_CONNECTING))
                .with_effect(CallEffect::render_timer(0))
                .with_effect(CallEffect::RequestCredential { attempt }))
        }

        (state, CallEvent::StartRequested) => Err(TransitionError::CallInProgress(state.as_str())),

        (CallState::Connecting, CallEvent::CredentialIssued { access_token }) => {
            Ok(TransitionResult::new(session.clone())
                .with_effect(CallEffect::StartProviderCall { access_token }))
        }

        (CallState::Connecting, CallEvent::CredentialFailed { .. }) => {
            Ok(fail(session, STATUS_CONNECTION_FAILED))
        }

        (CallState::Connecting, CallEvent::CallStarted { at }) => {
            let next = CallSession {
                state: CallState::Active,
                started_at: Some(at),
                elapsed_seconds: 0,
                attempt: session.attempt,
            };
            Ok(TransitionResult::new(next)
                .with_effect(CallEffect::SetStatus(STATUS_SPEAKING))
                .with_effect(CallEffect::render_timer(0))
                .with_effect(CallEffect::StartTicker {
                    attempt: session.attempt,
                }))
        }

        // The provider connected after the modal was dismissed
        (CallState::Idle, CallEvent::CallStarted { .. }) => {
            Ok(TransitionResult::new(session.clone()).with_effect(CallEffect::StopProviderCall))
        }

        // ============================================================
        // Active call
        // ============================================================
        (CallState::Active, CallEvent::Tick { attempt }) if attempt == session.attempt => {
            let mut next = session.clone();
            next.elapsed_seconds = next.elapsed_seconds.saturating_add(1);
            let display = CallEffect::render_timer(next.elapsed_seconds);
            Ok(TransitionResult::new(next).with_effect(display))
        }

        (CallState::Active, CallEvent::AgentStartTalking) => {
            Ok(TransitionResult::new(session.clone()).with_effect(CallEffect::SetSpeaking(true)))
        }

        (CallState::Active, CallEvent::AgentStopTalking) => {
            Ok(TransitionResult::new(session.clone()).with_effect(CallEffect::SetSpeaking(false)))
        }

        (CallState::Active | CallState::Connecting, CallEvent::CallEnded) => Ok(end(session)),

        (CallState::Active, CallEvent::HangUp) => {
            let result = end(session);
            Ok(TransitionResult::new(result.new_session)
                .with_effect(CallEffect::StopProviderCall)
                .with_effects(result.effects))
        }

        (CallState::Connecting, CallEvent::HangUp) => Ok(TransitionResult::new(idle(session))
            .with_effect(CallEffect::StopProviderCall)
            .with_effect(CallEffect::StopTicker)
            .with_effect(CallEffect::HideCallUi)),

        // ============================================================
        // Errors and teardown
        // ============================================================
        (
            CallState::Connecting | CallState::Active | CallState::Ended,
            CallEvent::ProviderError { .. },
        ) => Ok(fail(session, STATUS_CALL_ERROR)),

        (CallState::Ended | CallState::Failed, CallEvent::ResetDue { attempt })
            if attempt == session.attempt =>
        {
            Ok(TransitionResult::new(idle(session)).with_effects(reset_presentation()))
        }

        (CallState::Connecting, CallEvent::Dismiss) => Ok(TransitionResult::new(idle(session))
            .with_effect(CallEffect::StopProviderCall)
            .with_effect(CallEffect::StopTicker)
            .with_effects(reset_presentation())),

        (CallState::Ended | CallState::Failed, CallEvent::Dismiss) => {
            Ok(TransitionResult::new(idle(session))
                .with_effect(CallEffect::StopTicker)
                .with_effects(reset_presentation()))
        }

        // ============================================================
        // Late or redundant notifications: nothing to do
        // ============================================================
        (_, CallEvent::Tick { .. } | CallEvent::ResetDue { .. })
        | (CallState::Active | CallState::Idle, CallEvent::Dismiss)
        | (
            CallState::Idle | CallState::Ended | CallState::Failed,
            CallEvent::CredentialIssued { .. }
            | CallEvent::CredentialFailed { .. }
            | CallEvent::CallEnded
            | CallEvent::AgentStartTalking
            | CallEvent::AgentStopTalking,
        )
        | (CallState::Connecting, CallEvent::AgentStartTalking | CallEvent::AgentStopTalking)
        | (CallState::Idle | CallState::Failed, CallEvent::ProviderError { .. })
        | (CallState::Ended | CallState::Failed, CallEvent::HangUp) => {
            Ok(TransitionResult::new(session.clone()))
        }

        (state, event) => Err(TransitionError::InvalidTransition {
            state: state.as_str(),
            event: event.name(),
        }),
    }
}

fn idle(session: &CallSession) -> CallSession {
    CallSession {
        state: CallState::Idle,
        started_at: None,
        elapsed_seconds: 0,
        attempt: session.attempt,
    }
}

fn end(session: &CallSession) -> TransitionResult {
    TransitionResult::new(session.with_state(CallState::Ended))
        .with_effect(CallEffect::SetStatus(STATUS_CALL_ENDED))
        .with_effect(CallEffect::SetSpeaking(false))
        .with_effect(CallEffect::StopTicker)
        .with_effect(CallEffect::ScheduleReset {
            delay: ENDED_DISPLAY_DELAY,
            attempt: session.attempt,
        })
}

fn fail(session: &CallSession, status: &'static str) -> TransitionResult {
    TransitionResult::new(session.with_state(CallState::Failed))
        .with_effect(CallEffect::SetStatus(status))
        .with_effect(CallEffect::SetSpeaking(false))
        .with_effect(CallEffect::StopTicker)
        .with_effect(CallEffect::ScheduleReset {
            delay: FAILED_DISPLAY_DELAY,
            attempt: session.attempt,
        })
}

/// What closing the modal puts back on screen for the next call.
fn reset_presentation() -> [CallEffect; 4] {
    [
        CallEffect::HideCallUi,
        CallEffect::SetSpeaking(false),
        CallEffect::SetStatus(STATUS_CONNECTING),
        CallEffect::render_timer(0),
    ]
}
