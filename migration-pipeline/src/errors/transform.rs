//! Error types for the record transformer.
use migration_shared::types::{BatchArgsError, EntityKind};
use thiserror::Error;

/// Raised when a page cannot be turned into batch arguments.
///
/// Any of these fails the whole page; records are never skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("record {index} ({id}) invalid: {reason}")]
    TransformInvalid {
        index: usize,
        id: String,
        reason: String,
    },
    #[error("record {index} is a {actual}, page expected {expected}")]
    UnexpectedKind {
        index: usize,
        expected: EntityKind,
        actual: EntityKind,
    },
    #[error("batch columns misaligned: {0}")]
    Misaligned(#[from] BatchArgsError),
}

impl TransformError {
    pub fn invalid(index: usize, id: Option<&str>, reason: impl Into<String>) -> Self {
        Self::TransformInvalid {
            index,
            id: id.unwrap_or("<unknown>").to_string(),
            reason: reason.into(),
        }
    }
}
