//! Errors raised while taking the source snapshot for verification.
use subgraph::IndexerError;
use thiserror::Error;

use crate::errors::TransformError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("source fetch failed: {0}")]
    Fetch(#[from] IndexerError),
    #[error("source record invalid: {0}")]
    Transform(#[from] TransformError),
}
