//! Property-based tests for the call state machine
//!
//! These tests verify key invariants hold across arbitrary event sequences.

use super::transition::*;
use super::*;
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_event() -> impl Strategy<Value = CallEvent> {
    prop_oneof![
        Just(CallEvent::StartRequested),
        Just(CallEvent::HangUp),
        Just(CallEvent::Dismiss),
        "[a-z]{4,12}".prop_map(|access_token| CallEvent::CredentialIssued { access_token }),
        "[a-z ]{0,20}".prop_map(|reason| CallEvent::CredentialFailed { reason }),
        (0i64..2_000_000_000).prop_map(|secs| CallEvent::CallStarted {
            at: Utc.timestamp_opt(secs, 0).single().unwrap_or_default(),
        }),
        Just(CallEvent::CallEnded),
        Just(CallEvent::AgentStartTalking),
        Just(CallEvent::AgentStopTalking),
        "[a-z ]{0,20}".prop_map(|message| CallEvent::ProviderError { message }),
        (0u32..4).prop_map(|attempt| CallEvent::Tick { attempt }),
        (0u32..4).prop_map(|attempt| CallEvent::ResetDue { attempt }),
    ]
}

fn arb_state() -> impl Strategy<Value = CallState> {
    prop_oneof![
        Just(CallState::Idle),
        Just(CallState::Connecting),
        Just(CallState::Active),
        Just(CallState::Ended),
        Just(CallState::Failed),
    ]
}

fn arb_session() -> impl Strategy<Value = CallSession> {
    (arb_state(), 0u32..600, 0u32..4).prop_map(|(state, elapsed_seconds, attempt)| CallSession {
        state,
        started_at: None,
        elapsed_seconds,
        attempt,
    })
}

fn arb_active_session() -> impl Strategy<Value = CallSession> {
    (0i64..2_000_000_000, 0u32..600, 0u32..4).prop_map(|(secs, elapsed_seconds, attempt)| {
        CallSession {
            state: CallState::Active,
            started_at: Utc.timestamp_opt(secs, 0).single(),
            elapsed_seconds,
            attempt,
        }
    })
}

fn requests_credential(effects: &[CallEffect]) -> bool {
    effects
        .iter()
        .any(|e| matches!(e, CallEffect::RequestCredential { .. }))
}

// ============================================================================
// Invariants
// ============================================================================

proptest! {
    // Starting while a call exists never issues a credential request
    #[test]
    fn prop_start_outside_idle_is_noop(session in arb_session()) {
        prop_assume!(!session.is_idle());
        let result = transition(&session, CallEvent::StartRequested);
        prop_assert!(result.is_err());
    }

    // Elapsed time only moves while Active, by at most one per event
    #[test]
    fn prop_elapsed_only_increments_while_active(
        session in arb_session(),
        event in arb_event()
    ) {
        if let Ok(result) = transition(&session, event) {
            let before = session.elapsed_seconds;
            let after = result.new_session.elapsed_seconds;
            if after > before {
                prop_assert_eq!(session.state, CallState::Active);
                prop_assert_eq!(result.new_session.state, CallState::Active);
                prop_assert_eq!(after, before + 1);
            }
        }
    }

    // Entering Connecting always zeroes the counter
    #[test]
    fn prop_connecting_resets_elapsed(session in arb_session(), event in arb_event()) {
        if let Ok(result) = transition(&session, event) {
            if result.new_session.state == CallState::Connecting
                && session.state != CallState::Connecting
            {
                prop_assert_eq!(result.new_session.elapsed_seconds, 0);
            }
        }
    }

    // Over any event sequence: one credential request per accepted start, and
    // at most one attempt in flight
    #[test]
    fn prop_credential_requests_match_starts(
        events in proptest::collection::vec(arb_event(), 0..40)
    ) {
        let mut session = CallSession::new();
        let mut starts = 0u32;
        let mut requests = 0u32;
        for event in events {
            let was_idle = session.is_idle();
            let is_start = event == CallEvent::StartRequested;
            if let Ok(result) = transition(&session, event) {
                if requests_credential(&result.effects) {
                    requests += 1;
                    prop_assert!(was_idle && is_start);
                }
                if is_start {
                    starts += 1;
                }
                session = result.new_session;
            }
        }
        prop_assert_eq!(starts, requests);
        prop_assert_eq!(session.attempt, starts);
    }

    // Active is only reachable from Connecting
    #[test]
    fn prop_active_only_from_connecting(session in arb_session(), event in arb_event()) {
        if let Ok(result) = transition(&session, event) {
            if result.new_session.is_active() && !session.is_active() {
                prop_assert_eq!(session.state, CallState::Connecting);
            }
        }
    }

    // Leaving Active always stops the ticker
    #[test]
    fn prop_leaving_active_stops_ticker(session in arb_active_session(), event in arb_event()) {
        if let Ok(result) = transition(&session, event) {
            if !result.new_session.is_active() {
                prop_assert!(result.effects.contains(&CallEffect::StopTicker));
            }
        }
    }
}
