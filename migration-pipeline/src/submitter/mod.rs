//! Batch submitter.
//!
//! Walks the windows of a [`MigrationPlan`] in ascending order. Each window is
//! fetched, transformed, pinned, and then written with exactly one destination
//! call that must be confirmed before the next window starts. A failure at any
//! stage is recorded against its window and the run moves on; only an
//! unauthorized destination identity ends the run early.
//!
//! Request windows that fail are remembered. A later request window for one of
//! their creators fails at the ordering stage until the earlier window is
//! re-run and confirmed, so per-creator request indexes never shift.
mod ordering;
mod pinning;
mod plan;

pub use pinning::pin_blobs;
pub use plan::{MigrationPlan, Window};

use std::collections::BTreeSet;
use std::sync::Arc;

use ipfs::{ContentStore, PutOptions};
use migration_shared::types::{EntityKind, MigrationBatchArgs, RecordKey};
use subgraph::{validate_page, IndexerClient};
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use crate::destination::Destination;
use crate::errors::{MigrationError, TransformError, WindowError};
use crate::report::{MigrationReport, WindowReport, WindowStatus};
use crate::transformer::{request_creators, transform_page};

use ordering::{Blocker, UnconfirmedWindows};

pub struct BatchSubmitter {
    indexer: Arc<dyn IndexerClient>,
    store: Arc<dyn ContentStore>,
    destination: Arc<dyn Destination>,
    put_options: PutOptions,
    /// Serializes mutating destination calls across every caller of this
    /// submitter, retries included.
    call_lock: Mutex<()>,
    unconfirmed_requests: UnconfirmedWindows,
}

/// What a window got to before it finished or failed.
#[derive(Default)]
struct WindowProgress {
    fetched: Option<usize>,
    /// Creators referenced by a fetched request page.
    creators: Option<BTreeSet<String>>,
    metadata_uris: Vec<(RecordKey, String)>,
}

impl BatchSubmitter {
    pub fn new(
        indexer: Arc<dyn IndexerClient>,
        store: Arc<dyn ContentStore>,
        destination: Arc<dyn Destination>,
    ) -> Self {
        Self {
            indexer,
            store,
            destination,
            put_options: PutOptions::default(),
            call_lock: Mutex::new(()),
            unconfirmed_requests: UnconfirmedWindows::default(),
        }
    }

    pub fn with_put_options(mut self, put_options: PutOptions) -> Self {
        self.put_options = put_options;
        self
    }

    /// Migrate `[0, total_count)` of `kind` in windows of `batch_size`.
    pub async fn submit_all(
        &self,
        kind: EntityKind,
        total_count: usize,
        batch_size: usize,
    ) -> Result<MigrationReport, MigrationError> {
        self.submit_plan(&MigrationPlan::new(kind, total_count, batch_size))
            .await
    }

    #[instrument(skip(self), fields(kind = %plan.kind))]
    pub async fn submit_plan(&self, plan: &MigrationPlan) -> Result<MigrationReport, MigrationError> {
        self.validate(plan)?;

        let window_count = plan.window_count();
        info!(
            total_count = plan.total_count,
            batch_size = plan.batch_size,
            windows = window_count,
            start_window = plan.start_window,
            "Starting migration run"
        );

        let mut report = MigrationReport::new(plan.kind, plan.batch_size);

        for window in plan.windows() {
            let (window_report, short_page) = self.run_window(plan.kind, window).await?;
            report.windows.push(window_report);

            if short_page && window.index + 1 < window_count {
                warn!(
                    window = window.index,
                    remaining = window_count - window.index - 1,
                    "Indexer returned a short page, stopping before the expected total"
                );
                report.stopped_early = true;
                break;
            }
        }

        info!(
            attempted = report.windows.len(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            records = report.records_written(),
            "Migration run finished"
        );

        Ok(report)
    }

    /// Run a single window on its own, e.g. to retry one that failed.
    ///
    /// Failed request windows must be re-run in ascending order; a window
    /// sharing a creator with an earlier unconfirmed one fails at the ordering
    /// stage without reaching the destination.
    pub async fn submit_window(
        &self,
        kind: EntityKind,
        window: Window,
    ) -> Result<WindowReport, MigrationError> {
        validate_page(window.page_size, window.offset, self.indexer.max_page_size())?;
        let (report, _) = self.run_window(kind, window).await?;
        Ok(report)
    }

    fn validate(&self, plan: &MigrationPlan) -> Result<(), MigrationError> {
        if plan.batch_size == 0 {
            return Err(MigrationError::invalid_plan("batch size must be positive"));
        }
        validate_page(plan.batch_size, 0, self.indexer.max_page_size())?;
        if plan.start_window > plan.window_count() {
            return Err(MigrationError::invalid_plan(format!(
                "start window {} is past the last window {}",
                plan.start_window,
                plan.window_count()
            )));
        }
        Ok(())
    }

    /// Returns the window's report and whether its page was short.
    async fn run_window(
        &self,
        kind: EntityKind,
        window: Window,
    ) -> Result<(WindowReport, bool), MigrationError> {
        let mut progress = WindowProgress::default();
        let result = self.process_window(kind, window, &mut progress).await;
        let short_page = progress
            .fetched
            .is_some_and(|fetched| fetched < window.page_size);

        let status = match result {
            Ok(0) => {
                info!(window = window.index, offset = window.offset, "Window empty");
                WindowStatus::Empty
            }
            Ok(records) => {
                info!(
                    window = window.index,
                    offset = window.offset,
                    records,
                    "Window migrated"
                );
                WindowStatus::Succeeded { records }
            }
            Err(WindowError::Destination(source)) if source.is_fatal() => {
                error!(window = window.index, error = %source, "Destination identity rejected");
                return Err(MigrationError::Unauthorized {
                    window: window.index,
                    source,
                });
            }
            Err(e) => {
                error!(
                    window = window.index,
                    offset = window.offset,
                    stage = %e.stage(),
                    error = %e,
                    "Window failed"
                );
                WindowStatus::Failed {
                    stage: e.stage(),
                    message: e.to_string(),
                }
            }
        };

        if kind == EntityKind::Request {
            if matches!(status, WindowStatus::Failed { .. }) {
                let blocker = progress.creators.map_or(Blocker::Unknown, Blocker::Creators);
                self.unconfirmed_requests.hold(window.offset, blocker);
            } else {
                self.unconfirmed_requests.confirm(window.offset);
            }
        }

        let metadata_uris = match &status {
            WindowStatus::Succeeded { .. } => progress.metadata_uris,
            _ => Vec::new(),
        };
        let report = WindowReport {
            index: window.index,
            offset: window.offset,
            page_size: window.page_size,
            status,
            metadata_uris,
        };
        Ok((report, short_page))
    }

    async fn process_window(
        &self,
        kind: EntityKind,
        window: Window,
        progress: &mut WindowProgress,
    ) -> Result<usize, WindowError> {
        let mut records = self
            .indexer
            .fetch_page(kind, window.page_size, window.offset)
            .await?;
        progress.fetched = Some(records.len());
        records.truncate(window.expected);

        if records.is_empty() {
            return Ok(0);
        }

        if kind == EntityKind::Request {
            let creators = request_creators(&records);
            let blocked_by = self.unconfirmed_requests.blocking(window.offset, &creators);
            progress.creators = Some(creators);
            if let Some(earlier_offset) = blocked_by {
                return Err(WindowError::OutOfOrder {
                    offset: window.offset,
                    earlier_offset,
                });
            }
        }

        let page = transform_page(kind, &records)?;
        let uris = pin_blobs(self.store.as_ref(), &page.blobs, self.put_options).await?;
        let written: Vec<(RecordKey, String)> =
            page.rows.keys().into_iter().zip(uris.iter().cloned()).collect();
        let args = MigrationBatchArgs::assemble(page.rows, uris).map_err(TransformError::from)?;

        let _call = self.call_lock.lock().await;
        match &args {
            MigrationBatchArgs::Creator(args) => self.destination.migrate_creators(args).await?,
            MigrationBatchArgs::Request(args) => self.destination.migrate_requests(args).await?,
        }

        progress.metadata_uris = written;
        Ok(args.len())
    }
}
