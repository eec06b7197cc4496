//! Migration pipeline from the indexer to the on-chain destination.
//!
//! ```text
//! IndexerClient -> transformer -> ContentStore (concurrent puts)
//!               -> BatchSubmitter (one confirmed call per window) -> Verifier
//! ```
//!
//! Components:
//! - [`transformer`] maps raw indexer records to index-aligned batch rows and
//!   one metadata blob per record
//! - [`BatchSubmitter`] runs windows strictly in order, isolating failures per
//!   window, and returns a [`MigrationReport`]
//! - [`Destination`] is the ordered-call seam, with [`ContractDestination`]
//!   for the live contract and [`MockDestination`] for tests
//! - [`Verifier`] reads destination state back and returns a
//!   [`VerificationReport`]
//!
//! Nothing in this crate retries. A failed window stays failed in the report;
//! re-running it is the caller's decision.

pub mod destination;
pub mod errors;
pub mod report;
pub mod submitter;
pub mod transformer;
pub mod verifier;

pub use destination::{ContractDestination, Destination, MockDestination};
pub use errors::{DestinationError, MigrationError, TransformError, VerifyError, WindowError};
pub use report::{
    FailureStage, MigrationReport, RecordStatus, VerificationReport, WindowReport, WindowStatus,
};
pub use submitter::{BatchSubmitter, MigrationPlan, Window};
pub use verifier::{source_snapshot, SourceRecord, Verifier, DEFAULT_VERIFY_CONCURRENCY};
