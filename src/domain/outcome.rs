//! Per-call outcome record of the document builder.

use std::fmt;

/// Classified result of the most recent public builder operation.
///
/// Reset to [`Outcome::Ok`] when an operation starts; callers read it right
/// after the call through `DocumentBuilder::outcome`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Outcome {
    #[default]
    Ok,
    MissingIdentityKey,
    AmbiguousOrMissingParent,
    NotFound,
    InvalidInput,
}

impl Outcome {
    pub fn is_ok(self) -> bool {
        self == Outcome::Ok
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Ok => "ok",
            Outcome::MissingIdentityKey => "missing identity key",
            Outcome::AmbiguousOrMissingParent => "ambiguous or missing parent",
            Outcome::NotFound => "not found",
            Outcome::InvalidInput => "invalid input",
        };
        f.write_str(s)
    }
}
