//! Drives the pipeline for every entity kind and layers retry on top.
//!
//! The pipeline never retries. Here a window that failed can be re-submitted
//! a configured number of times with exponential backoff, after the full pass
//! has finished, so a stuck window never delays the ones after it.
//!
//! Failed windows are retried in ascending order. A request window held back
//! by an earlier one gets a single attempt once the earlier retries are done;
//! backing off would not help it.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use migration_pipeline::{
    source_snapshot, BatchSubmitter, FailureStage, MigrationError, MigrationPlan, MigrationReport,
    VerificationReport, Verifier, WindowReport, WindowStatus,
};
use migration_shared::types::{EntityKind, RecordKey};
use subgraph::IndexerClient;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{info, instrument, warn};

use crate::config::Mode;
use crate::MigratorError;

/// Entity kinds in the order they must be migrated; requests reference
/// creators.
const KINDS: [EntityKind; 2] = [EntityKind::Creator, EntityKind::Request];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    pub mode: Mode,
    pub batch_size: usize,
    pub creator_total: usize,
    pub request_total: usize,
    pub creator_start_window: usize,
    pub request_start_window: usize,
    pub retry_attempts: usize,
    pub retry_base_delay: Duration,
}

impl RunSettings {
    fn total(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Creator => self.creator_total,
            EntityKind::Request => self.request_total,
        }
    }

    fn start_window(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Creator => self.creator_start_window,
            EntityKind::Request => self.request_start_window,
        }
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub migrations: Vec<MigrationReport>,
    pub verifications: Vec<(EntityKind, VerificationReport)>,
}

impl RunSummary {
    pub fn failed_windows(&self) -> usize {
        self.migrations.iter().map(MigrationReport::failed).sum()
    }

    /// Records that verified as anything other than ok.
    pub fn unverified(&self) -> usize {
        self.verifications
            .iter()
            .map(|(_, report)| report.records.len() - report.ok())
            .sum()
    }

    /// Metadata URIs written by every successful window of this run.
    pub fn metadata_uris(&self) -> HashMap<RecordKey, String> {
        self.migrations
            .iter()
            .flat_map(|report| report.metadata_uris())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.failed_windows() == 0 && self.unverified() == 0
    }

    pub fn log(&self) {
        for report in &self.migrations {
            info!(
                kind = %report.kind,
                attempted = report.windows.len(),
                succeeded = report.succeeded(),
                failed = report.failed(),
                stopped_early = report.stopped_early,
                "Migration summary"
            );
            for window in report.failed_windows() {
                warn!(kind = %report.kind, window = window.index, offset = window.offset, status = ?window.status, "Window left failed");
            }
        }
        for (kind, report) in &self.verifications {
            info!(
                kind = %kind,
                ok = report.ok(),
                missing = report.missing(),
                mismatched = report.mismatched(),
                unreadable = report.unreadable(),
                "Verification summary"
            );
        }
    }
}

pub struct Runner {
    indexer: Arc<dyn IndexerClient>,
    submitter: BatchSubmitter,
    verifier: Verifier,
    settings: RunSettings,
}

/// Why a retried window attempt did not succeed.
enum RetryFailure {
    Failed(WindowReport),
    Fatal(MigrationError),
}

impl Runner {
    pub fn new(
        indexer: Arc<dyn IndexerClient>,
        submitter: BatchSubmitter,
        verifier: Verifier,
        settings: RunSettings,
    ) -> Self {
        Self {
            indexer,
            submitter,
            verifier,
            settings,
        }
    }

    #[instrument(skip(self), fields(mode = ?self.settings.mode))]
    pub async fn run(&self) -> Result<RunSummary, MigratorError> {
        let mut summary = RunSummary::default();

        if self.settings.mode.migrates() {
            for kind in KINDS {
                summary.migrations.push(self.migrate(kind).await?);
            }
        }

        if self.settings.mode.verifies() {
            let written_uris = summary.metadata_uris();
            for kind in KINDS {
                let source =
                    source_snapshot(self.indexer.as_ref(), kind, self.settings.batch_size).await?;
                let report = self.verifier.verify_with_uris(&source, &written_uris).await;
                summary.verifications.push((kind, report));
            }
        }

        Ok(summary)
    }

    async fn migrate(&self, kind: EntityKind) -> Result<MigrationReport, MigratorError> {
        let plan = MigrationPlan::new(kind, self.settings.total(kind), self.settings.batch_size)
            .starting_at(self.settings.start_window(kind));

        let mut report = self.submitter.submit_plan(&plan).await?;

        if self.settings.retry_attempts > 0 {
            let mut failed: Vec<usize> = report.failed_windows().map(|w| w.index).collect();
            failed.sort_unstable();
            for index in failed {
                if let Some(retried) = self.retry_window(&plan, index).await? {
                    report.replace(retried);
                }
            }
        }

        Ok(report)
    }

    /// Returns the report of the last attempt, or `None` if the window is not
    /// part of the plan.
    async fn retry_window(
        &self,
        plan: &MigrationPlan,
        index: usize,
    ) -> Result<Option<WindowReport>, MigratorError> {
        let Some(window) = plan.window(index) else {
            return Ok(None);
        };

        let strategy = backoff(self.settings.retry_base_delay, self.settings.retry_attempts);

        let submitter = &self.submitter;
        let kind = plan.kind;
        let attempt = move || async move {
            info!(kind = %kind, window = window.index, "Retrying window");
            match submitter.submit_window(kind, window).await {
                Ok(report) if report.is_failure() => Err(RetryFailure::Failed(report)),
                Ok(report) => Ok(report),
                Err(e) => Err(RetryFailure::Fatal(e)),
            }
        };
        let retryable = |failure: &RetryFailure| match failure {
            RetryFailure::Failed(report) => !held_back(report),
            RetryFailure::Fatal(_) => false,
        };

        match RetryIf::spawn(strategy, attempt, retryable).await {
            Ok(report) => Ok(Some(report)),
            Err(RetryFailure::Failed(report)) => {
                warn!(kind = %kind, window = index, "Window still failing after retries");
                Ok(Some(report))
            }
            Err(RetryFailure::Fatal(e)) => Err(e.into()),
        }
    }
}

fn held_back(report: &WindowReport) -> bool {
    matches!(
        report.status,
        WindowStatus::Failed {
            stage: FailureStage::Ordering,
            ..
        }
    )
}

/// Delays of roughly `first`, `10 * first`, `100 * first`, capped at 30s.
fn backoff(first: Duration, attempts: usize) -> impl Iterator<Item = Duration> {
    let factor = (u64::try_from(first.as_millis()).unwrap_or(u64::MAX) / 10).max(1);

    ExponentialBackoff::from_millis(10)
        .factor(factor)
        .max_delay(Duration::from_secs(30))
        .map(jitter)
        .take(attempts)
}
