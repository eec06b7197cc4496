//! Error types for a single migration window.
use ipfs::StoreError;
use subgraph::IndexerError;
use thiserror::Error;

use crate::errors::{DestinationError, TransformError};
use crate::report::FailureStage;

/// A failure at one stage of one window.
///
/// Caught at the submitter boundary and recorded in the report; the run goes
/// on with the next window.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] IndexerError),
    #[error("transform failed: {0}")]
    Transform(#[from] TransformError),
    #[error("pin failed: {0}")]
    Pin(#[from] StoreError),
    #[error("request window at offset {offset} waits on unconfirmed window at offset {earlier_offset}")]
    OutOfOrder { offset: usize, earlier_offset: usize },
    #[error("destination failed: {0}")]
    Destination(#[from] DestinationError),
}

impl WindowError {
    pub fn stage(&self) -> FailureStage {
        match self {
            WindowError::Fetch(_) => FailureStage::Fetch,
            WindowError::Transform(_) => FailureStage::Transform,
            WindowError::Pin(_) => FailureStage::Pin,
            WindowError::OutOfOrder { .. } => FailureStage::Ordering,
            WindowError::Destination(_) => FailureStage::Destination,
        }
    }
}
