//! Verifier.
//!
//! Reads the destination back for every source record and classifies it as
//! ok, missing, mismatched or unreadable. Reads are side-effect free and run
//! with bounded fan-out in any order; the report is returned in source order.
//!
//! The metadata URI is compared exactly when the migration run reported which
//! URI it wrote for a record; otherwise only its shape is checked.
use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use ipfs::URI_SCHEME;
use migration_shared::types::{CreatorRecord, EntityKind, RecordKey, RequestRecord};
use subgraph::{fetch_all, IndexerClient};
use tracing::{info, instrument, warn};

use crate::destination::{CreatorView, Destination, RequestView};
use crate::errors::VerifyError;
use crate::report::{FieldMismatch, RecordCheck, RecordStatus, VerificationReport};
use crate::transformer::source_records;

pub const DEFAULT_VERIFY_CONCURRENCY: usize = 20;

/// A normalized source record to check against the destination.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceRecord {
    Creator(CreatorRecord),
    Request(RequestRecord),
}

impl SourceRecord {
    pub fn key(&self) -> RecordKey {
        match self {
            SourceRecord::Creator(creator) => creator.key(),
            SourceRecord::Request(request) => request.key(),
        }
    }
}

/// Fetch and normalize every source record of `kind`.
pub async fn source_snapshot(
    indexer: &dyn IndexerClient,
    kind: EntityKind,
    page_size: usize,
) -> Result<Vec<SourceRecord>, VerifyError> {
    let raw = fetch_all(indexer, kind, page_size).await?;
    Ok(source_records(&raw)?)
}

pub struct Verifier {
    destination: Arc<dyn Destination>,
    concurrency: usize,
}

impl Verifier {
    pub fn new(destination: Arc<dyn Destination>) -> Self {
        Self {
            destination,
            concurrency: DEFAULT_VERIFY_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn verify(&self, records: &[SourceRecord]) -> VerificationReport {
        self.verify_with_uris(records, &HashMap::new()).await
    }

    /// Verify against the metadata URIs a migration run reported writing.
    #[instrument(skip_all, fields(records = records.len(), known_uris = written_uris.len()))]
    pub async fn verify_with_uris(
        &self,
        records: &[SourceRecord],
        written_uris: &HashMap<RecordKey, String>,
    ) -> VerificationReport {
        let mut checks: Vec<(usize, RecordCheck)> = stream::iter(records.iter().enumerate())
            .map(|(position, record)| async move {
                (position, self.check(record, written_uris).await)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        checks.sort_by_key(|(position, _)| *position);

        let report = VerificationReport {
            records: checks.into_iter().map(|(_, check)| check).collect(),
        };

        info!(
            ok = report.ok(),
            missing = report.missing(),
            mismatched = report.mismatched(),
            unreadable = report.unreadable(),
            "Verification finished"
        );

        report
    }

    async fn check(
        &self,
        record: &SourceRecord,
        written_uris: &HashMap<RecordKey, String>,
    ) -> RecordCheck {
        let key = record.key();
        let written_uri = written_uris.get(&key).map(String::as_str);

        let status = match record {
            SourceRecord::Creator(creator) => {
                match self.destination.get_creator(&creator.address).await {
                    Ok(Some(view)) => classify(creator_mismatches(creator, &view, written_uri)),
                    Ok(None) => RecordStatus::Missing,
                    Err(e) => RecordStatus::Unreadable(e.to_string()),
                }
            }
            SourceRecord::Request(request) => {
                match self
                    .destination
                    .get_request(&request.creator, request.request_id)
                    .await
                {
                    Ok(Some(view)) => classify(request_mismatches(request, &view, written_uri)),
                    Ok(None) => RecordStatus::Missing,
                    Err(e) => RecordStatus::Unreadable(e.to_string()),
                }
            }
        };

        match &status {
            RecordStatus::Missing => warn!(key = %key, "Record not migrated"),
            RecordStatus::Mismatched(fields) => {
                warn!(key = %key, fields = fields.len(), "Record differs from source")
            }
            RecordStatus::Unreadable(error) => warn!(key = %key, error = %error, "Read failed"),
            RecordStatus::Ok => {}
        }

        RecordCheck { key, status }
    }
}

fn classify(fields: Vec<FieldMismatch>) -> RecordStatus {
    if fields.is_empty() {
        RecordStatus::Ok
    } else {
        RecordStatus::Mismatched(fields)
    }
}

fn creator_mismatches(
    source: &CreatorRecord,
    view: &CreatorView,
    written_uri: Option<&str>,
) -> Vec<FieldMismatch> {
    let mut fields = Vec::new();
    compare(&mut fields, "name", &source.user_name, &view.name);
    check_metadata_uri(&mut fields, written_uri, &view.metadata_uri);
    fields
}

fn request_mismatches(
    source: &RequestRecord,
    view: &RequestView,
    written_uri: Option<&str>,
) -> Vec<FieldMismatch> {
    let mut fields = Vec::new();
    compare(&mut fields, "requester", &source.requester, &view.requester);
    compare(&mut fields, "amount", &source.amount, &view.amount);
    compare(&mut fields, "fulfilled", &source.fulfilled(), &view.fulfilled);
    check_metadata_uri(&mut fields, written_uri, &view.metadata_uri);
    fields
}

fn compare<T: PartialEq + ToString + ?Sized>(
    fields: &mut Vec<FieldMismatch>,
    field: &'static str,
    expected: &T,
    actual: &T,
) {
    if expected != actual {
        fields.push(FieldMismatch {
            field,
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
}

fn check_metadata_uri(fields: &mut Vec<FieldMismatch>, written: Option<&str>, actual: &str) {
    if let Some(written) = written {
        compare(fields, "metadataUri", written, actual);
        return;
    }

    let prefix = format!("{URI_SCHEME}://");
    let valid = actual
        .strip_prefix(&prefix)
        .is_some_and(|hash| !hash.is_empty());
    if !valid {
        fields.push(FieldMismatch {
            field: "metadataUri",
            expected: format!("{prefix}<hash>"),
            actual: actual.to_string(),
        });
    }
}
