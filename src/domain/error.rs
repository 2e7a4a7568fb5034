//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::outcome::Outcome;

/// Domain errors represent contract violations of the insertion engine.
/// None of them leaves a partial mutation behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("repeatable wrapper '{wrapper}' needs a non-empty '{attribute}' key")]
    MissingIdentityKey { wrapper: String, attribute: String },

    #[error("selector '{selector}' matched {matches} nodes, expected exactly one")]
    AmbiguousOrMissingParent { selector: String, matches: usize },

    #[error("nothing found for '{0}'")]
    NotFound(String),

    #[error("invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("unbound namespace prefix '{prefix}' in selector '{selector}'")]
    UnknownPrefix { selector: String, prefix: String },

    #[error("cannot bind namespace prefix '{prefix}': {message}")]
    InvalidBinding { prefix: String, message: String },

    #[error("unknown document variant: {0}")]
    UnknownVariant(String),

    #[error("invalid property value for '{property}': {message}")]
    InvalidValue { property: String, message: String },
}

impl DomainError {
    /// Classification reported through the per-call outcome record.
    pub fn outcome(&self) -> Outcome {
        match self {
            DomainError::MissingIdentityKey { .. } => Outcome::MissingIdentityKey,
            DomainError::AmbiguousOrMissingParent { .. } => Outcome::AmbiguousOrMissingParent,
            DomainError::NotFound(_) => Outcome::NotFound,
            DomainError::InvalidSelector { .. }
            | DomainError::UnknownPrefix { .. }
            | DomainError::InvalidBinding { .. }
            | DomainError::UnknownVariant(_)
            | DomainError::InvalidValue { .. } => Outcome::InvalidInput,
        }
    }
}

/// Result type for engine operations.
pub type DomainResult<T> = Result<T, DomainError>;
