// src/error.rs

//! Unified error handling for the reconciler.

use std::fmt;

use thiserror::Error;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Course or module absent after every lookup path was tried
    #[error("Not found: {what} ({context})")]
    NotFound { what: String, context: String },

    /// Acting user may not modify the course
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Malformed create/update input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Backend failure on a read or write
    #[error("Store error at '{path}': {message}")]
    Store { path: String, message: String },

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
}

impl AppError {
    /// Create a not-found error with diagnostic context.
    pub fn not_found(what: impl Into<String>, context: impl fmt::Display) -> Self {
        Self::NotFound {
            what: what.into(),
            context: context.to_string(),
        }
    }

    /// Create a permission error.
    pub fn permission(message: impl Into<String>) -> Self {
        Self::Permission(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a store error for a path.
    pub fn store(path: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Store {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether the error came from the backend rather than from the caller.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Self::Store { .. } | Self::Http(_) | Self::Io(_))
    }
}
