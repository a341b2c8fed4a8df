//! Backend configuration, read once from the process environment

use crate::llm::DEFAULT_GEMINI_MODEL;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;

/// Agent used when a web-call request does not name one
pub const DEFAULT_AGENT_ID: &str = "agent_e94708d2be383cc9083a9f9621";

#[derive(Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Secret key for the voice provider. Empty when unset; the provider
    /// rejects it, nothing here validates it.
    pub retell_api_key: String,
    pub retell_agent_id: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    /// Directory holding the marketing page (index.html, styles, scripts)
    pub static_dir: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            retell_api_key: lookup("RETELL_API_KEY").unwrap_or_default(),
            retell_agent_id: lookup("RETELL_AGENT_ID")
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| DEFAULT_AGENT_ID.to_string()),
            gemini_api_key: lookup("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: lookup("GEMINI_MODEL")
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            static_dir: lookup("CONCIERGE_STATIC_DIR")
                .map_or_else(|| PathBuf::from("."), PathBuf::from),
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(secret: &str) -> &'static str {
            if secret.is_empty() {
                "[UNSET]"
            } else {
                "[REDACTED]"
            }
        }

        f.debug_struct("ServerConfig")
            .field("port", &self.port)
            .field("retell_api_key", &redact(&self.retell_api_key))
            .field("retell_agent_id", &self.retell_agent_id)
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("gemini_model", &self.gemini_model)
            .field("static_dir", &self.static_dir)
            .finish()
    }
}
