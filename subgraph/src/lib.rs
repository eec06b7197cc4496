//! Paginated read client for the creators and requests subgraph.
//!
//! This crate provides:
//! - [`IndexerClient`] trait for fetching one page of raw records
//! - [`GraphClient`] production client speaking GraphQL over HTTP
//! - [`MockIndexer`] in-memory indexer for tests and local runs
//! - [`fetch_all`] helper that pages until the indexer returns a short page
//!
//! ## Usage
//!
//! ```ignore
//! use subgraph::{GraphClient, IndexerClient};
//! use migration_shared::types::EntityKind;
//!
//! let client = GraphClient::new("https://api.thegraph.com/subgraphs/name/...", 1000);
//! let first_page = client.fetch_page(EntityKind::Creator, 10, 0).await?;
//! ```
//!
//! Records are always ordered by ingestion timestamp, ascending, so repeated
//! pagination over a settled dataset returns the same pages. The client never
//! retries; retry policy belongs to the caller.

mod client;
mod mock;
pub mod raw;

pub use client::GraphClient;
pub use mock::MockIndexer;
pub use raw::{RawCreator, RawCreatorRef, RawRecord, RawRequest};

use async_trait::async_trait;
use migration_shared::types::EntityKind;
use tracing::debug;

/// Hard result-count limit of a subgraph query.
pub const DEFAULT_MAX_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexerError {
    #[error("fetch of {kind} page (size {page_size}, offset {offset}) failed: {reason}")]
    FetchFailed {
        kind: EntityKind,
        page_size: usize,
        offset: usize,
        reason: String,
    },
    #[error("page size {requested} exceeds indexer maximum {max}")]
    PageSizeExceeded { requested: usize, max: usize },
    #[error("offset {offset} is not a multiple of page size {page_size}")]
    InvalidOffset { offset: usize, page_size: usize },
}

impl IndexerError {
    pub fn fetch_failed(
        kind: EntityKind,
        page_size: usize,
        offset: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self::FetchFailed {
            kind,
            page_size,
            offset,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IndexerError>;

/// Read access to the indexer.
///
/// Implementations hold no shared mutable state and may be called from any
/// number of concurrent readers.
#[async_trait]
pub trait IndexerClient: Send + Sync {
    /// Maximum number of records a single page may request.
    fn max_page_size(&self) -> usize;

    /// Fetch up to `page_size` records of `kind`, skipping the first `offset`.
    ///
    /// A page shorter than `page_size` means there are no further records.
    async fn fetch_page(
        &self,
        kind: EntityKind,
        page_size: usize,
        offset: usize,
    ) -> Result<Vec<RawRecord>>;
}

/// Check page parameters against the indexer ceiling.
pub fn validate_page(page_size: usize, offset: usize, max_page_size: usize) -> Result<()> {
    if page_size == 0 || page_size > max_page_size {
        return Err(IndexerError::PageSizeExceeded {
            requested: page_size,
            max: max_page_size,
        });
    }
    if offset % page_size != 0 {
        return Err(IndexerError::InvalidOffset { offset, page_size });
    }
    Ok(())
}

/// Fetch every record of `kind`, page by page, stopping on the first short page.
///
/// The stop condition deliberately ignores any externally known total.
pub async fn fetch_all(
    client: &dyn IndexerClient,
    kind: EntityKind,
    page_size: usize,
) -> Result<Vec<RawRecord>> {
    validate_page(page_size, 0, client.max_page_size())?;

    let mut records = Vec::new();
    let mut offset = 0;

    loop {
        let page = client.fetch_page(kind, page_size, offset).await?;
        let fetched = page.len();
        records.extend(page);

        debug!(%kind, offset, fetched, total = records.len(), "Fetched page");

        if fetched < page_size {
            break;
        }
        offset += page_size;
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creators(count: usize) -> Vec<RawCreator> {
        (0..count)
            .map(|i| RawCreator {
                id: Some(format!("0x{i:040x}")),
                address: Some(format!("0x{i:040x}")),
                user_name: Some(format!("creator-{i}")),
                timestamp: Some((1_000 + i).to_string()),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn validate_page_rejects_oversized_page() {
        assert_eq!(
            validate_page(1001, 0, 1000),
            Err(IndexerError::PageSizeExceeded {
                requested: 1001,
                max: 1000
            })
        );
    }

    #[test]
    fn validate_page_rejects_zero_page() {
        assert!(validate_page(0, 0, 1000).is_err());
    }

    #[test]
    fn validate_page_rejects_unaligned_offset() {
        assert_eq!(
            validate_page(10, 15, 1000),
            Err(IndexerError::InvalidOffset {
                offset: 15,
                page_size: 10
            })
        );
        assert!(validate_page(10, 20, 1000).is_ok());
    }

    #[tokio::test]
    async fn fetch_all_stops_on_short_page() {
        let indexer = MockIndexer::new().with_creators(creators(23));

        let records = fetch_all(&indexer, EntityKind::Creator, 10).await.unwrap();

        assert_eq!(records.len(), 23);
        assert_eq!(indexer.fetch_count(), 3);
    }

    #[tokio::test]
    async fn fetch_all_issues_one_extra_fetch_on_exact_multiple() {
        let indexer = MockIndexer::new().with_creators(creators(20));

        let records = fetch_all(&indexer, EntityKind::Creator, 10).await.unwrap();

        assert_eq!(records.len(), 20);
        assert_eq!(indexer.fetch_count(), 3);
    }

    #[tokio::test]
    async fn fetch_all_surfaces_fetch_failures() {
        let indexer = MockIndexer::new().with_creators(creators(23));
        indexer.fail_page(EntityKind::Creator, 10);

        let err = fetch_all(&indexer, EntityKind::Creator, 10).await.unwrap_err();

        assert!(matches!(
            err,
            IndexerError::FetchFailed {
                offset: 10,
                page_size: 10,
                ..
            }
        ));
    }
}
