//! Errors that abort a whole migration run.
use subgraph::IndexerError;
use thiserror::Error;

use crate::errors::DestinationError;

/// Configuration-level failures. Unlike window failures these stop the run
/// immediately.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    #[error("invalid migration plan: {0}")]
    InvalidPlan(String),

    #[error("page parameters rejected: {0}")]
    PageParameters(#[from] IndexerError),

    #[error("window {window} aborted the run: {source}")]
    Unauthorized {
        window: usize,
        source: DestinationError,
    },
}

impl MigrationError {
    pub fn invalid_plan(msg: impl Into<String>) -> Self {
        Self::InvalidPlan(msg.into())
    }
}
