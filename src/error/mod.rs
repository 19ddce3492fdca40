//! Error types for the MTGJSON utility layer
//!
//! Every fallible operation in the crate returns [`UtilError`]. Recoverable
//! conditions (missing files to hash, missing notification credentials) are
//! handled locally and never reach this type.

use thiserror::Error;

/// Main error type for the utility layer
#[derive(Error, Debug, Clone)]
pub enum UtilError {
    // Configuration errors

    /// Options that cannot be combined or are out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    // Parallel invocation errors

    /// A per-item result did not have the shape required by the fold
    #[error("Cannot fold result #{index}: expected {expected}, found {found}")]
    FoldShape {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    /// A spawned task panicked or was cancelled
    #[error("Task failed: {0}")]
    TaskFailed(String),

    // Sorting errors

    /// Two values sharing a sequence have no natural ordering
    #[error("Cannot order {left} against {right}")]
    Unorderable {
        left: &'static str,
        right: &'static str,
    },

    // Network errors

    /// Transport level failure (connect, timeout, body read)
    #[error("Network error: {0}")]
    Network(String),

    /// URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Retryable HTTP status that persisted through every attempt
    #[error("HTTP error: {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// On-disk response cache failure
    #[error("Cache error: {0}")]
    Cache(String),

    // Data errors

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// The requested rules section could not be located
    #[error("Rules section not found: {0}")]
    RulesSection(String),

    /// Logger could not be installed
    #[error("Logging error: {0}")]
    Logging(String),

    /// Custom error with message
    #[error("{0}")]
    Custom(String),
}

/// Type alias for Results using `UtilError`
pub type Result<T> = std::result::Result<T, UtilError>;

impl UtilError {
    /// Create a custom error with a message
    pub fn custom<S: Into<String>>(msg: S) -> Self {
        Self::Custom(msg.into())
    }

    /// Create an invalid configuration error with a message
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Check if this error is a network-related error
    pub const fn is_network_error(&self) -> bool {
        matches!(self, Self::Network(_) | Self::HttpStatus { .. })
    }

    /// Check if this error comes from rejected configuration
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidConfiguration(_))
    }

    /// HTTP status carried by this error, if any
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for UtilError {
    fn from(error: reqwest::Error) -> Self {
        match error.status() {
            Some(status) => Self::HttpStatus {
                status: status.as_u16(),
                url: error.url().map(ToString::to_string).unwrap_or_default(),
            },
            None if error.is_timeout() => Self::Network(format!("timeout: {error}")),
            None => Self::Network(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for UtilError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<std::io::Error> for UtilError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<tokio::task::JoinError> for UtilError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::TaskFailed(error.to_string())
    }
}
