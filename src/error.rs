// src/error.rs

//! Unified error handling for the harvester.

use std::fmt;

use thiserror::Error;

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Every primary candidate and the mirror failed to resolve
    #[error("No endpoint available after probing {probed} candidate(s)")]
    NoEndpointAvailable { probed: usize },

    /// The resolved service declares zero records
    #[error("Dataset at {endpoint} declares zero records")]
    EmptyDataset { endpoint: String },

    /// The record count query failed, so there is nothing to page over
    #[error("Count query against {endpoint} failed: {message}")]
    CountQuery { endpoint: String, message: String },

    /// A single batch request failed
    #[error("Batch at offset {offset} failed: {message}")]
    BatchFetch { offset: u64, message: String },

    /// A response could not be interpreted
    #[error("Malformed response from {context}: {message}")]
    MalformedResponse { context: String, message: String },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a batch error for the request at `offset`.
    pub fn batch(offset: u64, message: impl fmt::Display) -> Self {
        Self::BatchFetch {
            offset,
            message: message.to_string(),
        }
    }

    /// Create a malformed-response error with context.
    pub fn malformed(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::MalformedResponse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a count-query error for the layer at `endpoint`.
    pub fn count(endpoint: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::CountQuery {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error must terminate the process with a failure status.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoEndpointAvailable { .. }
                | Self::EmptyDataset { .. }
                | Self::CountQuery { .. }
        )
    }
}
