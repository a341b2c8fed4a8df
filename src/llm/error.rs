//! LLM error types

use thiserror::Error;

/// LLM error with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
    /// HTTP status returned by the provider, when it answered at all.
    /// `message` then holds the provider's raw response body.
    pub status: Option<u16>,
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Network, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Unknown, message)
    }

    /// Classify a non-success provider response, keeping its raw body.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let kind = match status {
            400 => LlmErrorKind::InvalidRequest,
            401 | 403 => LlmErrorKind::Auth,
            429 => LlmErrorKind::RateLimit,
            500..=599 => LlmErrorKind::ServerError,
            _ => LlmErrorKind::Unknown,
        };
        Self {
            kind,
            message: body.into(),
            status: Some(status),
        }
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Network issues, timeouts
    Network,
    /// Rate limited (429)
    RateLimit,
    /// Server error (5xx)
    ServerError,
    /// Authentication failed (401, 403)
    Auth,
    /// Bad request (400)
    InvalidRequest,
    /// Unknown error
    Unknown,
}

impl LlmErrorKind {
    /// Whether trying again later could succeed. Nothing retries
    /// automatically; this only feeds logging.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::ServerError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_keeps_body_and_status() {
        let err = LlmError::from_status(429, "{\"error\":\"slow down\"}");
        assert_eq!(err.kind, LlmErrorKind::RateLimit);
        assert_eq!(err.status, Some(429));
        assert_eq!(err.message, "{\"error\":\"slow down\"}");
        assert!(err.kind.is_transient());

        assert_eq!(LlmError::from_status(403, "").kind, LlmErrorKind::Auth);
        assert_eq!(LlmError::from_status(503, "").kind, LlmErrorKind::ServerError);
        assert_eq!(LlmError::from_status(418, "").kind, LlmErrorKind::Unknown);
    }

    #[test]
    fn test_network_errors_have_no_status() {
        let err = LlmError::network("connection refused");
        assert!(err.status.is_none());
        assert_eq!(err.to_string(), "connection refused");
    }
}
