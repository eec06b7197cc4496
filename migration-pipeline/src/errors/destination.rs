//! Error types for the destination seam.
use thiserror::Error;

/// Errors returned by destination calls and reads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DestinationError {
    /// The call was rejected or reverted by the destination.
    #[error("destination rejected call: {0}")]
    Rejected(String),

    /// The destination could not be reached or did not confirm.
    #[error("destination unreachable: {0}")]
    Unreachable(String),

    /// The migration identity is not accepted by the destination. Fatal for a run.
    #[error("destination identity unauthorized: {0}")]
    Unauthorized(String),
}

impl DestinationError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn unreachable(msg: impl Into<String>) -> Self {
        Self::Unreachable(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}
