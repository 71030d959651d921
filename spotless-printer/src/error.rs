use thiserror::Error;

/// Print agent and signing bridge errors
#[derive(Debug, Error)]
pub enum PrintError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Print agent error: {0}")]
    Agent(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Signing disabled: {0}")]
    SigningDisabled(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Certificate error: {0}")]
    Certificate(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PrintResult<T> = Result<T, PrintError>;

impl PrintError {
    /// Failures of the signing path (never fatal for printing itself)
    pub fn is_signing(&self) -> bool {
        matches!(
            self,
            PrintError::SigningDisabled(_) | PrintError::SigningFailed(_) | PrintError::Timeout(_)
        )
    }
}
