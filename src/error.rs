//! Errors raised while managing Livy sessions and their statements.

use std::sync::LazyLock;

use livy_client::{LivyError, SessionState};
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SparkError {
    /// The remote session is gone or unusable; re-resolve a session and retry.
    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("The Spark session is {state} and could not be created in the cluster: {log}")]
    SessionCreation { state: SessionState, log: String },

    /// Remote execution reported an error for a single statement.
    #[error("{0}")]
    Statement(String),

    #[error("Invalid result payload: {0}")]
    InvalidPayload(String),

    #[error("Livy error: {0}")]
    Remote(#[from] LivyError),

    #[error("Session store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SparkError {
    /// Whether the caller should resolve a fresh session and try again.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, SparkError::SessionExpired(_))
    }
}

pub type Result<T> = std::result::Result<T, SparkError>;

static SESSION_NOT_FOUND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"session ('\d+' )?not found").expect("valid regex"));

/// What a raw remote error message says about the session it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// `session 'N' not found`
    SessionNotFound,
    /// The service could not be reached at all
    ConnectionRefused,
    /// `session is in state busy`
    SessionBusy,
    Other,
}

impl ErrorKind {
    /// Errors that go away once a fresh session is resolved.
    pub fn is_recoverable(self) -> bool {
        !matches!(self, ErrorKind::Other)
    }
}

/// Classify free-text error output from the remote service.
///
/// Matching is case-insensitive. Livy's error contract is exactly these
/// messages, so the predicates stay literal.
pub fn classify(message: &str) -> ErrorKind {
    let message = message.to_lowercase();

    if SESSION_NOT_FOUND_RE.is_match(&message) {
        ErrorKind::SessionNotFound
    } else if message.contains("connection refused") {
        ErrorKind::ConnectionRefused
    } else if message.contains("session is in state busy") {
        ErrorKind::SessionBusy
    } else {
        ErrorKind::Other
    }
}

/// Render an error and all of its sources on one line.
///
/// reqwest hides "Connection refused" a few levels down the source chain.
pub fn error_chain_text(err: &(dyn std::error::Error + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_session_not_found() {
        assert_eq!(classify("Session '12' not found."), ErrorKind::SessionNotFound);
        assert_eq!(classify("session not found"), ErrorKind::SessionNotFound);
        assert_eq!(
            classify("API error (404): Session '3' not found."),
            ErrorKind::SessionNotFound
        );
    }

    #[test]
    fn classifies_connection_refused() {
        assert_eq!(
            classify("error sending request: tcp connect error: Connection refused (os error 111)"),
            ErrorKind::ConnectionRefused
        );
    }

    #[test]
    fn classifies_busy_session() {
        assert_eq!(
            classify("Session is in state busy"),
            ErrorKind::SessionBusy
        );
    }

    #[test]
    fn other_errors_are_not_recoverable() {
        let kind = classify("API error (400): Invalid kind");
        assert_eq!(kind, ErrorKind::Other);
        assert!(!kind.is_recoverable());
        assert!(ErrorKind::SessionBusy.is_recoverable());
    }

    #[test]
    fn session_id_must_be_quoted_digits() {
        // "session abc not found" does not match the literal pattern
        assert_eq!(classify("session abc not found"), ErrorKind::Other);
    }

    #[test]
    fn error_chain_includes_sources() {
        let inner = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Connection refused");
        let outer = SparkError::Io(inner);
        let text = error_chain_text(&outer);
        assert!(text.contains("IO error"));
        assert_eq!(classify(&text), ErrorKind::ConnectionRefused);
    }

    #[test]
    fn creation_error_message() {
        let err = SparkError::SessionCreation {
            state: SessionState::Dead,
            log: "timeout".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "The Spark session is dead and could not be created in the cluster: timeout"
        );
    }
}
