//! Error types for Cisco CLI Expert
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Cisco CLI Expert operations
///
/// This enum encompasses the failures that can occur while loading
/// configuration, talking to a provider, persisting session state,
/// decoding speech audio, or validating user input.
#[derive(Error, Debug)]
pub enum CliExpertError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-related errors (transport failures, malformed responses)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Upstream provider answered with a non-success HTTP status
    ///
    /// The proxy server passes these through with the same status code.
    #[error("Upstream error {status}: {message}")]
    Upstream {
        /// HTTP status code returned by the upstream service
        status: u16,
        /// Message extracted from the upstream error body
        message: String,
    },

    /// Input rejected before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing credentials for provider
    #[error("Missing credentials for provider: {0}")]
    MissingCredentials(String),

    /// Operation is not offered by the selected provider
    #[error("Not supported by this provider: {0}")]
    Unsupported(String),

    /// Speech audio payload could not be decoded
    #[error("Audio decode error: {0}")]
    Audio(String),

    /// Session storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

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

    /// Base64 decoding errors
    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl CliExpertError {
    /// HTTP status the proxy server should answer with for this error
    ///
    /// Upstream failures keep their original status; input problems map to
    /// 400, unsupported operations to 501 and everything else to 500.
    ///
    /// # Examples
    ///
    /// ```
    /// use cliexpert::error::CliExpertError;
    ///
    /// let err = CliExpertError::Upstream { status: 429, message: "slow down".into() };
    /// assert_eq!(err.http_status(), 429);
    /// assert_eq!(CliExpertError::Validation("empty".into()).http_status(), 400);
    /// ```
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Upstream { status, .. } => *status,
            Self::Validation(_) => 400,
            Self::Unsupported(_) => 501,
            _ => 500,
        }
    }
}

/// Result type alias for Cisco CLI Expert operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
