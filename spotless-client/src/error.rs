//! Client error types

use shared::order::OrderError;
use spotless_printer::PrintError;
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure talking to the gateway
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway answered with an unexpected status
    #[error("Gateway error ({status}): {message}")]
    Gateway { status: u16, message: String },

    /// Authentication required
    #[error("Authentication required")]
    Unauthorized,

    /// Permission denied
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The gateway refused the write (constraint, bad payload)
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Refused locally before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Order(#[from] OrderError),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Realtime error: {0}")]
    Realtime(String),

    #[error("Print error: {0}")]
    Print(#[from] PrintError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Raised locally, nothing was sent
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Order(_) | Self::Config(_))
    }
}
