//! Error types for the Livy client.

use thiserror::Error;

/// Errors that can occur when talking to a Livy server.
#[derive(Debug, Error)]
pub enum LivyError {
    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Livy answered with a non-success status code
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl LivyError {
    /// HTTP status code returned by Livy, if the request got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            LivyError::ApiError { status, .. } => Some(*status),
            LivyError::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for LivyError {
    fn from(err: serde_json::Error) -> Self {
        LivyError::ParseError(err.to_string())
    }
}

impl From<url::ParseError> for LivyError {
    fn from(err: url::ParseError) -> Self {
        LivyError::ConfigError(err.to_string())
    }
}
