//! Semantic error type raised by analysis.

use std::fmt;

/// Categories of semantic analysis failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisErrorKind {
    /// A relation name could not be bound against the catalog.
    UnresolvedRelation,

    /// A column name could not be bound against the input schema.
    UnresolvedColumn,

    /// Operand types are incompatible with an operator or clause.
    TypeMismatch,

    /// The analyzer itself misbehaved (e.g. no fixpoint reached).
    Internal,
}

impl AnalysisErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::UnresolvedRelation => "UnresolvedRelation",
            Self::UnresolvedColumn => "UnresolvedColumn",
            Self::TypeMismatch => "TypeMismatch",
            Self::Internal => "Internal",
        }
    }
}

/// A semantic error: a plan could not be fully resolved or failed a
/// post-resolution consistency check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisError {
    kind: AnalysisErrorKind,
    message: String,
}

impl AnalysisError {
    pub fn new(kind: AnalysisErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> AnalysisErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AnalysisError {}
