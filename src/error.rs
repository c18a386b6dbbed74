//! Error types for chatshell
//!
//! This module defines the error types used throughout the client,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for chatshell operations
///
/// Covers configuration loading, completion service calls, conversation
/// editing, and the I/O and serialization layers underneath them.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-related errors (client construction, unsupported operations)
    #[error("Provider error: {0}")]
    Provider(String),

    /// A completion call failed (network, provider, or credentials)
    ///
    /// The request controller never lets this escape; it is converted into
    /// the fallback assistant reply.
    #[error("Completion failed: {0}")]
    CompletionFailure(String),

    /// Missing credentials for provider
    #[error("Missing credentials for provider: {0}")]
    MissingCredentials(String),

    /// The requested message cannot be edited
    #[error("Message {index} cannot be edited: {reason}")]
    EditNotAllowed {
        /// Index of the message the caller tried to edit
        index: usize,
        /// Why the edit was rejected
        reason: String,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for chatshell operations
///
/// Uses `anyhow::Error` so callers can attach context while propagating.
pub type Result<T> = anyhow::Result<T>;
