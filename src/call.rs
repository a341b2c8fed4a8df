//! Voice call state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! provider callbacks, timers and user actions all arrive as [`CallEvent`]s,
//! and every side effect leaves as a [`CallEffect`] for the session runtime
//! to execute.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::CallEffect;
pub use event::CallEvent;
pub use state::{format_elapsed, CallSession, CallState};
pub use transition::{transition, TransitionError, TransitionResult};
