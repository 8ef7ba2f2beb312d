//! Aldin Error Types
//!
//! One enum per failure family the orchestrator recovers from, plus a
//! crate-level error for everything that can fail at startup.

use thiserror::Error;

/// Failure of a dialog round-trip to the chat-completions endpoint
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestFailure {
    #[error("HTTP {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RequestFailure {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => RequestFailure::Status(status.as_u16()),
            None => RequestFailure::Transport(err.to_string()),
        }
    }
}

/// Failure reported by a speech recognition session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecognitionFailure {
    #[error("not-allowed")]
    NotAllowed,

    #[error("not-supported")]
    Unsupported,

    #[error("insecure-origin")]
    InsecureOrigin,

    #[error("no-speech")]
    NoSpeech,

    #[error("aborted")]
    Aborted,

    #[error("network: {0}")]
    Network(String),

    #[error("backend: {0}")]
    Backend(String),
}

impl RecognitionFailure {
    /// Transient failures do not end a wake loop on their own
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RecognitionFailure::NoSpeech
                | RecognitionFailure::Aborted
                | RecognitionFailure::Network(_)
        )
    }
}

/// No speech synthesis capability is available
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("speech synthesis unavailable: {0}")]
pub struct SynthesisUnavailable(pub String);

/// Central error type for Aldin
#[derive(Error, Debug)]
pub enum AldinError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dialog error: {0}")]
    Request(#[from] RequestFailure),

    #[error("Recognition error: {0}")]
    Recognition(#[from] RecognitionFailure),

    #[error(transparent)]
    Synthesis(#[from] SynthesisUnavailable),

    #[error("Audio output error: {0}")]
    Audio(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Aldin operations
pub type AldinResult<T> = Result<T, AldinError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(RecognitionFailure::NoSpeech.is_transient());
        assert!(RecognitionFailure::Network("offline".into()).is_transient());
        assert!(!RecognitionFailure::NotAllowed.is_transient());
        assert!(!RecognitionFailure::InsecureOrigin.is_transient());
    }

    #[test]
    fn test_request_failure_display() {
        assert_eq!(RequestFailure::Status(500).to_string(), "HTTP 500");
    }
}
