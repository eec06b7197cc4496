//! Per-window and per-record outcomes of a run.
use std::collections::HashMap;
use std::fmt;

use migration_shared::types::{EntityKind, RecordKey};

/// The pipeline stage a window failed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureStage {
    Fetch,
    Transform,
    Pin,
    /// An earlier request window for the same creator has not confirmed.
    Ordering,
    Destination,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            FailureStage::Fetch => "fetch",
            FailureStage::Transform => "transform",
            FailureStage::Pin => "pin",
            FailureStage::Ordering => "ordering",
            FailureStage::Destination => "destination",
        };
        f.write_str(stage)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowStatus {
    /// The destination accepted a call carrying `records` records.
    Succeeded { records: usize },
    /// Nothing was written for this window.
    Failed { stage: FailureStage, message: String },
    /// The indexer returned no records; no destination call was made.
    Empty,
}

/// Outcome of one `(offset, batch_size)` window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowReport {
    pub index: usize,
    pub offset: usize,
    pub page_size: usize,
    pub status: WindowStatus,
    /// Metadata URI written for each record, empty unless the window succeeded.
    pub metadata_uris: Vec<(RecordKey, String)>,
}

impl WindowReport {
    pub fn is_success(&self) -> bool {
        matches!(self.status, WindowStatus::Succeeded { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, WindowStatus::Failed { .. })
    }
}

/// Outcome of a whole migration run, one entry per attempted window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub kind: EntityKind,
    pub batch_size: usize,
    pub windows: Vec<WindowReport>,
    /// A short page ended the run before every planned window was attempted.
    pub stopped_early: bool,
}

impl MigrationReport {
    pub fn new(kind: EntityKind, batch_size: usize) -> Self {
        Self {
            kind,
            batch_size,
            windows: Vec::new(),
            stopped_early: false,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.windows.iter().filter(|w| w.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.windows.iter().filter(|w| w.is_failure()).count()
    }

    /// Records written across all successful windows.
    pub fn records_written(&self) -> usize {
        self.windows
            .iter()
            .map(|w| match w.status {
                WindowStatus::Succeeded { records } => records,
                _ => 0,
            })
            .sum()
    }

    pub fn failed_windows(&self) -> impl Iterator<Item = &WindowReport> {
        self.windows.iter().filter(|w| w.is_failure())
    }

    /// Metadata URIs written across all successful windows, by record key.
    pub fn metadata_uris(&self) -> HashMap<RecordKey, String> {
        self.windows
            .iter()
            .filter(|w| w.is_success())
            .flat_map(|w| w.metadata_uris.iter().cloned())
            .collect()
    }

    pub fn window(&self, index: usize) -> Option<&WindowReport> {
        self.windows.iter().find(|w| w.index == index)
    }

    /// Replace the entry for `report.index`, e.g. after a retry.
    pub fn replace(&mut self, report: WindowReport) {
        match self.windows.iter_mut().find(|w| w.index == report.index) {
            Some(existing) => *existing = report,
            None => {
                self.windows.push(report);
                self.windows.sort_by_key(|w| w.index);
            }
        }
    }
}

/// One field that differs between source and destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMismatch {
    pub field: &'static str,
    pub expected: String,
    pub actual: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub key: RecordKey,
    pub fields: Vec<FieldMismatch>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordStatus {
    Ok,
    Missing,
    Mismatched(Vec<FieldMismatch>),
    /// The destination read itself failed.
    Unreadable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordCheck {
    pub key: RecordKey,
    pub status: RecordStatus,
}

/// Per-record outcome of a verification pass, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    pub records: Vec<RecordCheck>,
}

impl VerificationReport {
    pub fn ok(&self) -> usize {
        self.count(|s| matches!(s, RecordStatus::Ok))
    }

    pub fn missing(&self) -> usize {
        self.count(|s| matches!(s, RecordStatus::Missing))
    }

    pub fn mismatched(&self) -> usize {
        self.count(|s| matches!(s, RecordStatus::Mismatched(_)))
    }

    pub fn unreadable(&self) -> usize {
        self.count(|s| matches!(s, RecordStatus::Unreadable(_)))
    }

    pub fn is_clean(&self) -> bool {
        self.ok() == self.records.len()
    }

    pub fn missing_keys(&self) -> Vec<&RecordKey> {
        self.records
            .iter()
            .filter(|r| r.status == RecordStatus::Missing)
            .map(|r| &r.key)
            .collect()
    }

    pub fn mismatches(&self) -> Vec<Mismatch> {
        self.records
            .iter()
            .filter_map(|r| match &r.status {
                RecordStatus::Mismatched(fields) => Some(Mismatch {
                    key: r.key.clone(),
                    fields: fields.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&RecordStatus) -> bool) -> usize {
        self.records.iter().filter(|r| pred(&r.status)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(index: usize, status: WindowStatus) -> WindowReport {
        WindowReport {
            index,
            offset: index * 10,
            page_size: 10,
            status,
            metadata_uris: Vec::new(),
        }
    }

    #[test]
    fn counts_by_status() {
        let mut report = MigrationReport::new(EntityKind::Creator, 10);
        report.windows = vec![
            window(0, WindowStatus::Succeeded { records: 10 }),
            window(
                1,
                WindowStatus::Failed {
                    stage: FailureStage::Pin,
                    message: "down".to_string(),
                },
            ),
            window(2, WindowStatus::Succeeded { records: 3 }),
        ];

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.records_written(), 13);
        assert_eq!(
            report.failed_windows().map(|w| w.index).collect::<Vec<_>>(),
            [1]
        );
    }

    #[test]
    fn metadata_uris_come_from_successful_windows() {
        let key = |address: &str| RecordKey::Creator {
            address: address.to_string(),
        };
        let mut ok = window(0, WindowStatus::Succeeded { records: 1 });
        ok.metadata_uris = vec![(key("0xa"), "ipfs://a".to_string())];
        let mut report = MigrationReport::new(EntityKind::Creator, 10);
        report.windows = vec![ok];

        let uris = report.metadata_uris();

        assert_eq!(uris.len(), 1);
        assert_eq!(uris[&key("0xa")], "ipfs://a");
    }

    #[test]
    fn replace_overwrites_by_index() {
        let mut report = MigrationReport::new(EntityKind::Request, 10);
        report.windows = vec![window(
            0,
            WindowStatus::Failed {
                stage: FailureStage::Fetch,
                message: "timeout".to_string(),
            },
        )];

        report.replace(window(0, WindowStatus::Succeeded { records: 10 }));

        assert_eq!(report.windows.len(), 1);
        assert_eq!(report.failed(), 0);
    }

    #[test]
    fn verification_counts() {
        let key = |address: &str| RecordKey::Creator {
            address: address.to_string(),
        };
        let report = VerificationReport {
            records: vec![
                RecordCheck {
                    key: key("0xa"),
                    status: RecordStatus::Ok,
                },
                RecordCheck {
                    key: key("0xb"),
                    status: RecordStatus::Missing,
                },
                RecordCheck {
                    key: key("0xc"),
                    status: RecordStatus::Mismatched(vec![FieldMismatch {
                        field: "name",
                        expected: "carol".to_string(),
                        actual: "c".to_string(),
                    }]),
                },
            ],
        };

        assert_eq!(report.ok(), 1);
        assert_eq!(report.missing(), 1);
        assert_eq!(report.mismatched(), 1);
        assert!(!report.is_clean());
        assert_eq!(report.missing_keys(), [&key("0xb")]);
        assert_eq!(report.mismatches()[0].fields[0].field, "name");
    }
}
