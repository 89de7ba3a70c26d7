//! Core error types for steady-core.
//!
//! One umbrella [`CoreError`] with per-concern sub-enums, all built on
//! thiserror. Gateway and draft failures are recoverable by design -- the
//! flow keeps moving on local state -- so most of these surface only in the
//! CLI layer or in logs, never as panics.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for steady-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Session gateway / planner call failures
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Draft persistence errors
    #[error("Draft error: {0}")]
    Draft(#[from] DraftError),

    /// Local history database errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Errors from the session gateway and planner calls.
///
/// Everything except [`GatewayError::SessionNotCreated`] is treated as a
/// connectivity failure: recovered locally and retried on a later
/// transition.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Transport-level failure (connect, timeout, body decode).
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("Gateway returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The configured base URL does not parse.
    #[error("Invalid gateway base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    /// Response body did not match the expected shape.
    #[error("Unexpected gateway response: {0}")]
    Decode(String),

    /// Ending a session requires an identifier that was never assigned.
    ///
    /// This is the one gateway failure that must stay user-visible.
    #[error("Session was never created on the backend; cannot end it")]
    SessionNotCreated,

    /// Failed to build the internal async runtime for the HTTP client.
    #[error("Runtime error: {0}")]
    Runtime(std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key in get/set
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse a value for an existing key
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Draft persistence errors.
///
/// Note that an unreadable draft is deliberately *not* an error on load:
/// the store reports "no draft" and the run starts fresh. These variants
/// cover the write side.
#[derive(Error, Debug)]
pub enum DraftError {
    #[error("Failed to write draft to {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove draft at {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize draft: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Local history database errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        DatabaseError::QueryFailed(err.to_string())
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
