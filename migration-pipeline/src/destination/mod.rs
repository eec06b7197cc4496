//! The destination seam.
//!
//! The destination is an append-only, ordered-call target. Mutating calls
//! return only once the destination has confirmed them; callers are expected
//! to keep at most one mutating call in flight per migration identity.
mod contract;
mod mock;

pub use contract::ContractDestination;
pub use mock::{DestinationCall, MockDestination};

use alloy::primitives::U256;
use async_trait::async_trait;
use migration_shared::types::{CreatorBatchArgs, RequestBatchArgs};

use crate::errors::DestinationError;

pub type Result<T> = std::result::Result<T, DestinationError>;

/// A creator as stored at the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatorView {
    pub name: String,
    pub metadata_uri: String,
}

/// A request as stored at the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestView {
    pub requester: String,
    pub amount: U256,
    pub fulfilled: bool,
    pub metadata_uri: String,
}

#[async_trait]
pub trait Destination: Send + Sync {
    /// Migrate one batch of creators in a single confirmed call.
    async fn migrate_creators(&self, args: &CreatorBatchArgs) -> Result<()>;

    /// Migrate one batch of requests in a single confirmed call.
    async fn migrate_requests(&self, args: &RequestBatchArgs) -> Result<()>;

    /// Point read of a creator by normalized address. `None` if not migrated.
    async fn get_creator(&self, address: &str) -> Result<Option<CreatorView>>;

    /// Point read of a request by creator address and request index.
    async fn get_request(&self, creator: &str, request_id: u64) -> Result<Option<RequestView>>;
}

/// Classify a raw failure message from the destination.
///
/// Identity problems (not the owner, no funds to pay for calls) abort a run;
/// everything else only fails the current window.
pub(crate) fn classify_failure(message: String) -> DestinationError {
    const IDENTITY_MARKERS: [&str; 4] = ["unauthorized", "not owner", "ownable", "insufficient funds"];

    let lowered = message.to_ascii_lowercase();
    if IDENTITY_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        DestinationError::Unauthorized(message)
    } else {
        DestinationError::Rejected(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_failures_are_fatal() {
        let err = classify_failure("execution reverted: Ownable: caller is not the owner".into());
        assert!(err.is_fatal());

        let err = classify_failure("insufficient funds for gas * price + value".into());
        assert!(err.is_fatal());
    }

    #[test]
    fn other_failures_reject_the_call() {
        let err = classify_failure("execution reverted: creator already registered".into());
        assert_eq!(
            err,
            DestinationError::Rejected("execution reverted: creator already registered".into())
        );
    }
}
