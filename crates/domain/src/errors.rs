//! Error types used throughout the ADK workspace

use thiserror::Error;

/// Main error type for ADK operations
#[derive(Error, Debug)]
pub enum AdkError {
    /// A required configuration value is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A non-2xx response from the remote system, enriched with the ABAP
    /// error code and message extracted from the response body.
    #[error("HTTP {status}: {code} - {message}")]
    Transport { code: String, status: u16, message: String },

    /// The request never produced a response (timeout, connection reset).
    #[error("Connection to the system failed: {0}")]
    Connection(String),

    /// A 2xx response whose payload decoded to the zero value of the
    /// expected entity - the server refused the operation.
    #[error("Request to ABAP System not successful")]
    EmptyResponse,

    /// The response body could not be decoded at all.
    #[error("Could not parse response from the ABAP Environment system: {0}")]
    Parse(String),

    /// A semantically invalid state (duplicate names, ambiguous results).
    #[error("{0}")]
    Semantic(String),

    /// A poll loop exceeded its cumulative runtime.
    #[error("Timed out ({0})")]
    Timeout(String),

    /// The selected API version does not offer this operation.
    #[error("Not supported by this API version: {0}")]
    NotSupported(String),

    /// File system failure while saving a downloaded artifact.
    #[error("I/O error: {0}")]
    Io(String),
}

impl AdkError {
    /// The ABAP wire error code, if this error carries one.
    pub fn wire_code(&self) -> Option<&str> {
        match self {
            AdkError::Transport { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Result type alias for ADK operations
pub type Result<T> = std::result::Result<T, AdkError>;
