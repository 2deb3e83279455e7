//! Error types for corpus-fetch
//!
//! This module provides the error taxonomy for the library:
//! - [`StoreError`] - failures reported by an object store backend
//! - [`FetchError`] - failures of the concurrent fetch (listing, download, cancellation)
//! - [`Error`] - the crate-level error, including configuration and query errors
//! - HTTP status code mapping and structured error bodies for the API

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for corpus-fetch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for corpus-fetch
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "corpus.container")
        key: Option<String>,
    },

    /// Fetching the corpus failed
    #[error("failed to fetch files: {0}")]
    Fetch(#[from] FetchError),

    /// Object store construction or access failed outside of a fetch
    #[error("object store error: {0}")]
    Store(#[from] StoreError),

    /// The query string could not be parsed or the search pattern could not be compiled
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The request deadline elapsed before the fetch completed
    #[error("request timed out after {0:?}")]
    RequestTimeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// Failures of a concurrent fetch
///
/// Exactly one of these is surfaced per failed [`fetch_all`](crate::ConcurrentFetcher::fetch_all)
/// call, even when several downloads failed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Listing the container failed; no download was dispatched
    #[error("failed to iterate over files in {container} starting with {prefix}: {source}")]
    Listing {
        /// Container that was being listed
        container: String,
        /// Prefix the listing was filtered by
        prefix: String,
        /// Underlying store failure
        #[source]
        source: StoreError,
    },

    /// Opening or reading one object failed
    #[error("failed to download {object}: {source}")]
    Download {
        /// Identifier of the object that failed
        object: String,
        /// Underlying store failure
        #[source]
        source: StoreError,
    },

    /// A download task ended without reporting an outcome
    #[error("download task for {object} aborted: {reason}")]
    TaskAborted {
        /// Identifier the task was downloading
        object: String,
        /// Why the task ended (e.g. the panic message)
        reason: String,
    },

    /// The caller cancelled the fetch
    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether this failure was caused by the caller cancelling
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

/// Failures reported by an object store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// The container (bucket) does not exist
    #[error("container {0} not found")]
    ContainerNotFound(String),

    /// The object does not exist
    #[error("object {0} not found")]
    ObjectNotFound(String),

    /// A container or object name is not acceptable to the backend
    #[error("invalid name {name:?}: {reason}")]
    InvalidName {
        /// The rejected name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// The store answered with an unexpected HTTP status
    #[error("store returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// HTTP transport error
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error while opening or reading an object
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store answered with a body that could not be understood
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "download_failed",
///     "message": "failed to fetch files: failed to download b.txt: object b.txt not found",
///     "details": {
///       "object": "b.txt"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "listing_failed", "invalid_query")
    pub code: String,

    /// Human-readable error message, the display text of the error verbatim
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::InvalidQuery(_) => 400,

            // 502 Bad Gateway - the object store failed us
            Error::Fetch(FetchError::Listing { .. }) => 502,
            Error::Fetch(FetchError::Download { .. }) => 502,
            Error::Store(_) => 502,

            Error::Fetch(FetchError::TaskAborted { .. }) => 500,
            Error::Fetch(FetchError::Cancelled) => 503,
            Error::RequestTimeout(_) => 504,

            Error::Config { .. } => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Fetch(e) => match e {
                FetchError::Listing { .. } => "listing_failed",
                FetchError::Download { .. } => "download_failed",
                FetchError::TaskAborted { .. } => "task_aborted",
                FetchError::Cancelled => "cancelled",
            },
            Error::Store(_) => "store_error",
            Error::InvalidQuery(_) => "invalid_query",
            Error::RequestTimeout(_) => "request_timeout",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Fetch(FetchError::Listing {
                container, prefix, ..
            }) => Some(serde_json::json!({
                "container": container,
                "prefix": prefix,
            })),
            Error::Fetch(FetchError::Download { object, .. })
            | Error::Fetch(FetchError::TaskAborted { object, .. }) => Some(serde_json::json!({
                "object": object,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::RequestTimeout(timeout) => Some(serde_json::json!({
                "timeout_secs": timeout.as_secs_f64(),
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
