//! In-memory indexer for tests and local development.
//!
//! Records are held per entity kind and served ordered by timestamp, the same
//! guarantee the live subgraph query gives. Individual pages can be made to
//! fail to exercise the caller's failure handling.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use migration_shared::types::EntityKind;

use crate::{
    validate_page, IndexerClient, IndexerError, RawCreator, RawRecord, RawRequest, Result,
    DEFAULT_MAX_PAGE_SIZE,
};

/// Mock indexer that serves pre-configured records.
pub struct MockIndexer {
    creators: Vec<RawRecord>,
    requests: Vec<RawRecord>,
    max_page_size: usize,
    failing_pages: Mutex<HashSet<(EntityKind, usize)>>,
    fetches: AtomicUsize,
}

impl MockIndexer {
    pub fn new() -> Self {
        Self {
            creators: Vec::new(),
            requests: Vec::new(),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            failing_pages: Mutex::new(HashSet::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_creators(mut self, creators: Vec<RawCreator>) -> Self {
        self.creators = sorted(creators.into_iter().map(RawRecord::Creator).collect());
        self
    }

    pub fn with_requests(mut self, requests: Vec<RawRequest>) -> Self {
        self.requests = sorted(requests.into_iter().map(RawRecord::Request).collect());
        self
    }

    pub fn with_max_page_size(mut self, max_page_size: usize) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    /// Make every fetch of `kind` at `offset` fail.
    pub fn fail_page(&self, kind: EntityKind, offset: usize) {
        self.failing_pages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((kind, offset));
    }

    /// Stop failing fetches of `kind` at `offset`.
    pub fn heal_page(&self, kind: EntityKind, offset: usize) {
        self.failing_pages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(kind, offset));
    }

    /// Number of `fetch_page` calls served so far, failed ones included.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Default for MockIndexer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IndexerClient for MockIndexer {
    fn max_page_size(&self) -> usize {
        self.max_page_size
    }

    async fn fetch_page(
        &self,
        kind: EntityKind,
        page_size: usize,
        offset: usize,
    ) -> Result<Vec<RawRecord>> {
        validate_page(page_size, offset, self.max_page_size)?;
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failing_pages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(kind, offset));
        if failing {
            return Err(IndexerError::fetch_failed(
                kind,
                page_size,
                offset,
                "mock indexer unavailable",
            ));
        }

        let records = match kind {
            EntityKind::Creator => &self.creators,
            EntityKind::Request => &self.requests,
        };

        Ok(records
            .iter()
            .skip(offset)
            .take(page_size)
            .cloned()
            .collect())
    }
}

/// Stable sort by timestamp; records without a parseable timestamp go last.
fn sorted(mut records: Vec<RawRecord>) -> Vec<RawRecord> {
    records.sort_by_key(|record| record.timestamp().unwrap_or(u64::MAX));
    records
}
