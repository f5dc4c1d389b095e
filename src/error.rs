// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Error types for act-as
//!
//! `MissingParameter` is the only error a caller is expected to fix by
//! changing its input; everything else is reported as a server-side failure.

use thiserror::Error;

/// Main error type for act-as operations
#[derive(Error, Debug)]
pub enum ActAsError {
    /// No bot definition with the requested name
    #[error("Bot {0} not found")]
    NotFound(String),

    /// A template lookup failed on a parameter the caller did not supply
    #[error("'{0}' is required!")]
    MissingParameter(String),

    /// A bot message used a role outside system/human/ai/function
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// Template could not be compiled or rendered
    #[error("Template error: {0}")]
    Template(String),

    /// API-related errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// API-specific error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Authentication failed (invalid API key)
    #[error("Authentication failed: invalid API key")]
    AuthenticationFailed,

    /// Rate limited by the API
    #[error("Rate limited: retry after {0} seconds")]
    RateLimited(u32),

    /// Requested model not found
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Network connectivity error
    #[error("Network error: {0}")]
    Network(String),

    /// API returned an error
    #[error("API error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Timeout waiting for response
    #[error("Request timed out")]
    Timeout,

    /// Streaming error
    #[error("Streaming error: {0}")]
    StreamError(String),
}

impl ActAsError {
    /// True for errors caused by the caller's input rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ActAsError::MissingParameter(_))
    }
}

/// Result type alias for act-as operations
pub type Result<T> = std::result::Result<T, ActAsError>;

impl From<minijinja::Error> for ActAsError {
    fn from(err: minijinja::Error) -> Self {
        ActAsError::Template(err.to_string())
    }
}
