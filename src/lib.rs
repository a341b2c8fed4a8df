//! Academy Concierge
//!
//! Backend and conversation session for the academy site's assistant,
//! "Sarah": a chat popup that talks either to the site's own chat endpoint
//! or to an embedded third-party chat widget, plus a voice call mode backed
//! by a hosted voice agent.

pub mod api;
pub mod call;
pub mod config;
pub mod llm;
pub mod persona;
pub mod session;
pub mod transcript;
pub mod transport;
pub mod voice;
pub mod widget;
