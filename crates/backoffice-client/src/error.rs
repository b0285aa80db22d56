//! Error types for the REST client

use thiserror::Error;

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while talking to the back-office API
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport failure (connection refused, timeout, TLS, ...)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Token rejected by the API
    #[error("Not authorized for {endpoint}")]
    Unauthorized {
        /// Endpoint that was called
        endpoint: String,
    },

    /// Resource does not exist
    #[error("Resource not found: {endpoint}")]
    NotFound {
        /// Endpoint that was called
        endpoint: String,
    },

    /// Any other non-success status
    #[error("API returned {status} for {endpoint}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Endpoint that was called
        endpoint: String,
    },

    /// Body did not have the expected shape
    #[error("Failed to decode response from {endpoint}: {source}")]
    Decode {
        /// Endpoint that was called
        endpoint: String,
        /// Underlying JSON error
        source: serde_json::Error,
    },

    /// Invalid client setup
    #[error("Invalid configuration: {message}")]
    Configuration {
        /// Error message
        message: String,
    },
}

impl ClientError {
    /// Map a non-success status to the matching variant
    #[must_use]
    pub fn from_status(status: reqwest::StatusCode, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        match status {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                Self::Unauthorized { endpoint }
            }
            reqwest::StatusCode::NOT_FOUND => Self::NotFound { endpoint },
            other => Self::Status {
                status: other.as_u16(),
                endpoint,
            },
        }
    }
}
