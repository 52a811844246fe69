//! Typed errors for the extraction library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.
//!
//! Only [`ExtractionError`] ever reaches the caller of a run. [`BackendError`]
//! is absorbed per chunk by the orchestrator; [`FetchError`] only surfaces from
//! the URL entry point.

use std::time::Duration;

use thiserror::Error;

/// Errors that abort an extraction run before (or instead of) producing a table.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Missing/invalid credentials or an unsupported backend selection
    #[error("config error: {0}")]
    Config(String),

    /// Caller input rejected before any processing
    #[error("invalid input: {reason}")]
    Input { reason: String },

    /// Page could not be fetched
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Operation was cancelled
    #[error("operation cancelled")]
    Cancelled,

    /// Table could not be persisted
    #[error("export error: {0}")]
    Export(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ExtractionError {
    pub(crate) fn input(reason: impl Into<String>) -> Self {
        Self::Input {
            reason: reason.into(),
        }
    }
}

/// Errors from a single backend call.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Client could not be configured for the call
    #[error("backend misconfigured: {0}")]
    Config(String),

    /// Transport failure
    #[error("network error: {0}")]
    Network(String),

    /// Credentials rejected at call time
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Backend answered with an error or refused the content
    #[error("backend rejected request: {0}")]
    Rejected(String),

    /// Call exceeded its deadline
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Call succeeded but produced no text
    #[error("empty response")]
    Empty,
}

/// Errors that can occur while fetching a page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Non-success status code
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Invalid URL format or scheme
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Connection timeout
    #[error("timeout fetching: {url}")]
    Timeout { url: String },
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Result type alias for backend calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;
