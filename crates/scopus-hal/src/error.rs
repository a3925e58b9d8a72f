//! Error types for the Scopus to HAL depositor.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.

use std::time::Duration;

/// Errors from the HAL HTTP client layer.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Middleware error
    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// Rate limited by the HAL API (429 response)
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Suggested wait time before retry
        retry_after: Duration,
    },

    /// Resource not found (404 response)
    #[error("Resource not found: {resource}")]
    NotFound {
        /// Description of the missing resource
        resource: String,
    },

    /// Invalid request parameters (400 response)
    #[error("Bad request: {message}")]
    BadRequest {
        /// Error message from API
        message: String,
    },

    /// JSON parsing error
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Server error (5xx response)
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Unexpected HTTP status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },

    /// The SWORD endpoint refused the deposited notice.
    #[error("Deposit rejected ({status}): {message}")]
    DepositRejected {
        /// HTTP status code
        status: u16,
        /// SWORD error document or message
        message: String,
    },
}

impl ClientError {
    /// Create a rate limited error with retry-after duration.
    #[must_use]
    pub fn rate_limited(seconds: u64) -> Self {
        Self::RateLimited { retry_after: Duration::from_secs(seconds) }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    /// Create a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into() }
    }

    /// Create a server error.
    #[must_use]
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server { status, message: message.into() }
    }

    /// Create a deposit rejection.
    #[must_use]
    pub fn deposit_rejected(status: u16, message: impl Into<String>) -> Self {
        Self::DepositRejected { status, message: message.into() }
    }
}

/// Errors raised while reading input tables (Scopus exports, alias table).
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    /// File could not be opened or read.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Offending path
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// CSV decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SourceError {
    /// Wrap an I/O error with the path that caused it.
    #[must_use]
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// Errors from TEI serialization.
#[derive(thiserror::Error, Debug)]
pub enum TeiError {
    /// XML writer failure
    #[error("XML write error: {0}")]
    Xml(String),

    /// Serialized output was not valid UTF-8
    #[error("TEI output is not UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Errors that abort the processing of a single record.
///
/// None of these stop the batch; the orchestrator turns each into a log row.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// Remote repository call failed
    #[error("HAL API error: {0}")]
    Client(#[from] ClientError),

    /// Document could not be serialized
    #[error("TEI error: {0}")]
    Tei(#[from] TeiError),

    /// Writing the generated notice or the report failed
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),

    /// Report table could not be appended
    #[error("Report error: {0}")]
    Report(#[from] csv::Error),
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type alias for source readers.
pub type SourceResult<T> = Result<T, SourceError>;

/// Result type alias for pipeline stages.
pub type PipelineResult<T> = Result<T, PipelineError>;
