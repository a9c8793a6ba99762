//! Core error types for teamtally-core.
//!
//! Only conditions that stop a run are errors. Lookup misses, attribution
//! misses and single-container fetch failures are reported as values (see
//! [`crate::report::Notice`]) and never travel through this hierarchy.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for teamtally-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Event source errors that abort the run (directory or container listing)
    #[error("Event source error: {0}")]
    Source(#[from] SourceError),

    /// The primary board of a board audit could not be resolved
    #[error("Cannot find board {board}{}", .team.as_ref().map(|t| format!(" in team {t}")).unwrap_or_default())]
    BoardNotFound { board: String, team: Option<String> },

    /// Chart sink failures
    #[error("Chart error: {0}")]
    Chart(String),

    /// Report serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
///
/// All of these are raised before any request is made.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A date argument did not match the configured format
    #[error("Invalid date for '{field}': '{value}' does not match format '{format}'")]
    InvalidDate {
        field: String,
        value: String,
        format: String,
    },

    /// A required credential or target was empty
    #[error("Missing required value: {0}")]
    MissingCredential(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Errors raised by an [`crate::source::EventSource`] request.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Transport failure
    #[error("{endpoint}: request failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status
    #[error("{endpoint}: HTTP {status}")]
    Status { endpoint: String, status: u16 },

    /// The service answered but reported a failure in its payload
    #[error("{endpoint}: {message}")]
    Api { endpoint: String, message: String },

    /// The payload did not have the expected shape
    #[error("{endpoint}: unexpected response: {message}")]
    Decode { endpoint: String, message: String },

    /// Base URL or endpoint could not be joined into a valid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The blocking runtime could not be created
    #[error("Runtime error: {0}")]
    Runtime(#[source] std::io::Error),
}

impl SourceError {
    pub(crate) fn http(endpoint: &str, source: reqwest::Error) -> Self {
        SourceError::Http {
            endpoint: endpoint.to_string(),
            source,
        }
    }

    pub(crate) fn decode(endpoint: &str, message: impl Into<String>) -> Self {
        SourceError::Decode {
            endpoint: endpoint.to_string(),
            message: message.into(),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
