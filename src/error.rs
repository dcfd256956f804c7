//! Error types for jira-scrape
//!
//! This module provides the error taxonomy of the extraction pipeline:
//! - Transient failures (network, rate limiting, server errors) that the retry layer absorbs
//! - Client errors (other 4xx) that abort the current project immediately
//! - Local failures (I/O, serialization, configuration)
//!
//! Checkpoint corruption is deliberately absent: an unreadable checkpoint degrades to an
//! empty state instead of producing an error.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for jira-scrape operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for jira-scrape
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "page_size")
        key: Option<String>,
    },

    /// The remote API answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Http {
        /// Response status code
        status: u16,
        /// Request URL (including query string)
        url: String,
        /// Parsed `Retry-After` header, if the server sent an integer value
        retry_after: Option<Duration>,
    },

    /// Network-level failure (connect, timeout, reset)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error (checkpoint or output files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A successful response whose body could not be decoded
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Base URL or request path could not be parsed
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// HTTP status code carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            Error::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True for permanent client-side rejections (4xx other than 429)
    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(s) if (400..500).contains(&s) && s != 429)
    }

    pub(crate) fn config(message: impl Into<String>, key: &str) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}
