// Domain Error Types

use super::sepa::SepaError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Protocol description, job definition or profile absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed or missing bank parameter data
    #[error("Bad data: {0}")]
    BadData(String),

    /// Signature or encryption policy breach, always fatal to the current round
    #[error("Security violation: {0}")]
    SecurityViolation(String),

    /// Response without security block
    #[error("Generic error: {0}")]
    Generic(String),

    /// Continuation hook returned something other than "done" or "more"
    #[error("Job callback failed with code {0}")]
    Callback(i32),

    #[error("Invalid job state: {0}")]
    InvalidState(String),

    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Export profile selection failed
    #[error("SEPA error: {0}")]
    Sepa(#[from] SepaError),
}

impl DomainError {
    /// True for errors that must abort the current message round
    pub fn is_security(&self) -> bool {
        matches!(self, DomainError::SecurityViolation(_) | DomainError::Generic(_))
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
