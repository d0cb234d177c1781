//! Error types for the RL core library

use thiserror::Error;

/// Core error type for RL operations
#[derive(Error, Debug)]
pub enum RLError {
    /// Invalid configuration (unknown policy name, bad parameters, bad bounds)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A precondition of the requested operation does not hold
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// Invalid action
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Invalid state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Operation not supported for this element type
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Sampling was requested from a domain with no members
    #[error("Empty domain: {0}")]
    EmptyDomain(String),

    /// No rewards have been recorded for the action
    #[error("No reward history for action {0}")]
    NoHistory(String),

    /// The step protocol of the environment iterator was not followed
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Environment-related errors
    #[error("Environment error: {0}")]
    Environment(String),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected size
        expected: usize,
        /// Actual size
        actual: usize,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for RL operations
pub type Result<T> = std::result::Result<T, RLError>;
