//! Error types for the crawlflow library.
//!
//! Fetch failures are terminal for a single request and surface as a failed
//! [`FetchResult`](crate::core::FetchResult); every other error kind is
//! recovered close to where it occurs. The enum here is what fallible
//! library calls return.

use std::collections::HashMap;
use thiserror::Error;

/// The main error type for crawlflow operations.
#[derive(Debug, Error)]
pub enum CrawlflowError {
    /// A strategy could not retrieve the document.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// A fetch exceeded its wall-clock budget.
    #[error("Fetch timed out after {seconds}s: {url}")]
    Timeout {
        /// The address being fetched.
        url: String,
        /// The budget that was exceeded.
        seconds: f64,
    },

    /// The independent extraction pass failed.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// The cache/store could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration was missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The address could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A tool-related error.
    #[error("{0}")]
    Tool(#[from] ToolError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrawlflowError {
    /// Creates a fetch error.
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch(message.into())
    }

    /// Creates an extraction error.
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }

    /// Creates a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Short machine-readable kind, used in logs and tool output.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch",
            Self::Timeout { .. } => "timeout",
            Self::Extraction(_) => "extraction",
            Self::Storage(_) => "storage",
            Self::Config(_) => "config",
            Self::InvalidUrl(_) => "invalid_url",
            Self::Tool(_) => "tool",
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("kind".to_string(), serde_json::json!(self.kind()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

impl From<serde_json::Error> for CrawlflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<sqlx::Error> for CrawlflowError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<url::ParseError> for CrawlflowError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

/// Errors raised by the agent tool surface.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    /// Tool was not found.
    #[error("Tool not found: {name}")]
    NotFound {
        /// The tool name.
        name: String,
    },

    /// Tool arguments did not match the tool's schema.
    #[error("Invalid arguments for tool {name}: {reason}")]
    InvalidArguments {
        /// The tool name.
        name: String,
        /// What was wrong.
        reason: String,
    },

    /// Tool execution failed.
    #[error("Tool execution failed: {name} - {reason}")]
    ExecutionFailed {
        /// The tool name.
        name: String,
        /// The failure reason.
        reason: String,
    },
}
