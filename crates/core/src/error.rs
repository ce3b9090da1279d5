// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("SEPA error: {0}")]
    Sepa(#[from] crate::domain::SepaError),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Security failures abort the current round of the affected job
    pub fn is_security(&self) -> bool {
        matches!(self, AppError::Domain(e) if e.is_security())
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
