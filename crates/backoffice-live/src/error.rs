//! Error types for the live order view

use backoffice_client::ClientError;
use thiserror::Error;

/// Result type alias for live view operations
pub type Result<T> = std::result::Result<T, LiveError>;

/// Errors raised by the push channel and the order view
#[derive(Error, Debug)]
pub enum LiveError {
    /// The initial order fetch failed
    #[error("Failed to load orders: {message}")]
    Load {
        /// Operator-facing reason
        message: String,
    },

    /// The push channel stopped and will not reconnect
    #[error("Push channel closed")]
    ChannelClosed,

    /// Operator input that is not a known command
    #[error("Unknown command: {input}")]
    InvalidCommand {
        /// The rejected input
        input: String,
    },

    /// REST API failure
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Configuration or data error from the core crate
    #[error(transparent)]
    Core(#[from] backoffice_core::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LiveError {
    /// Message suitable for showing to the operator
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Client(ClientError::Unauthorized { .. }) => {
                "Session expired or not authorized, please log in again".to_string()
            }
            Self::Client(ClientError::Http(_)) => {
                "Could not reach the server, check your connection".to_string()
            }
            other => other.to_string(),
        }
    }
}
