//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("invalid recipe: {message}")]
    Recipe { message: String },

    #[error("step {index} failed: {source}")]
    Step {
        index: usize,
        #[source]
        source: DomainError,
    },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    /// Domain error behind this failure, if any.
    pub fn domain_error(&self) -> Option<&DomainError> {
        match self {
            ApplicationError::Domain(e) | ApplicationError::Step { source: e, .. } => Some(e),
            _ => None,
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
