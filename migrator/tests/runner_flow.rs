//! Runner tests against in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use ipfs::MockContentStore;
use migration_pipeline::{BatchSubmitter, MigrationError, MockDestination, Verifier};
use migration_shared::types::EntityKind;
use migrator::{MigratorError, Mode, RunSettings, Runner};
use subgraph::{MockIndexer, RawCreator, RawCreatorRef, RawRequest};

fn creator_address(i: usize) -> String {
    format!("0x{:040x}", 0x1000 + i)
}

fn creators(count: usize) -> Vec<RawCreator> {
    (0..count)
        .map(|i| RawCreator {
            id: Some(creator_address(i)),
            address: Some(creator_address(i)),
            user_name: Some(format!("creator-{i}")),
            timestamp: Some((1_600_000_000 + i).to_string()),
            ..Default::default()
        })
        .collect()
}

fn requests(count: usize, creators: usize) -> Vec<RawRequest> {
    (0..count)
        .map(|i| RawRequest {
            id: Some(format!("request-{i}")),
            request_id: Some((i / creators).to_string()),
            requester: Some(format!("0x{:040x}", 0xbeef00 + i)),
            creator: Some(RawCreatorRef {
                id: Some(creator_address(i % creators)),
            }),
            amount: Some("5000".to_string()),
            delivered: Some(false),
            refunded: Some(false),
            timestamp: Some((1_700_000_000 + i).to_string()),
            ..Default::default()
        })
        .collect()
}

fn settings(mode: Mode, creator_total: usize, request_total: usize) -> RunSettings {
    RunSettings {
        mode,
        batch_size: 10,
        creator_total,
        request_total,
        creator_start_window: 0,
        request_start_window: 0,
        retry_attempts: 0,
        retry_base_delay: Duration::from_millis(10),
    }
}

fn runner(indexer: MockIndexer, destination: Arc<MockDestination>, settings: RunSettings) -> Runner {
    let indexer = Arc::new(indexer);
    let submitter = BatchSubmitter::new(
        indexer.clone(),
        Arc::new(MockContentStore::new()),
        destination.clone(),
    );
    Runner::new(indexer, submitter, Verifier::new(destination), settings)
}

#[tokio::test]
async fn full_run_migrates_and_verifies_everything() {
    let destination = Arc::new(MockDestination::new());
    let indexer = MockIndexer::new()
        .with_creators(creators(23))
        .with_requests(requests(30, 23));

    let summary = runner(indexer, destination.clone(), settings(Mode::All, 23, 30))
        .run()
        .await
        .unwrap();

    assert!(summary.is_complete());
    assert_eq!(summary.migrations.len(), 2);
    assert_eq!(summary.verifications.len(), 2);
    assert_eq!(destination.creator_count(), 23);
    assert_eq!(destination.request_count(), 30);
}

#[tokio::test]
async fn failed_window_without_retry_is_reported() {
    let destination = Arc::new(MockDestination::new());
    destination.fail_call(1);

    let summary = runner(
        MockIndexer::new().with_creators(creators(23)),
        destination,
        settings(Mode::All, 23, 0),
    )
    .run()
    .await
    .unwrap();

    assert!(!summary.is_complete());
    assert_eq!(summary.failed_windows(), 1);
    assert_eq!(summary.unverified(), 10);
}

#[tokio::test(start_paused = true)]
async fn failed_window_is_retried_before_requests() {
    let destination = Arc::new(MockDestination::new());
    destination.fail_call(1);
    let mut settings = settings(Mode::All, 23, 30);
    settings.retry_attempts = 2;
    let indexer = MockIndexer::new()
        .with_creators(creators(23))
        .with_requests(requests(30, 23));

    let summary = runner(indexer, destination.clone(), settings)
        .run()
        .await
        .unwrap();

    assert!(summary.is_complete());
    let creator_calls: Vec<bool> = destination
        .calls()
        .iter()
        .filter(|call| call.kind == EntityKind::Creator)
        .map(|call| call.accepted)
        .collect();
    assert_eq!(creator_calls, [true, false, true, true]);
}

#[tokio::test(start_paused = true)]
async fn held_back_request_window_lands_after_its_predecessor_is_retried() {
    let destination = Arc::new(MockDestination::new());
    // Call 0 migrates the creator; call 2 is the second request window.
    destination.fail_call(2);
    let mut settings = settings(Mode::All, 1, 30);
    settings.retry_attempts = 2;
    let indexer = MockIndexer::new()
        .with_creators(creators(1))
        .with_requests(requests(30, 1));

    let summary = runner(indexer, destination.clone(), settings)
        .run()
        .await
        .unwrap();

    assert!(summary.is_complete());
    assert_eq!(destination.request_count(), 30);
    let request_calls: Vec<(usize, bool)> = destination
        .calls()
        .iter()
        .filter(|call| call.kind == EntityKind::Request)
        .map(|call| (call.records, call.accepted))
        .collect();
    assert_eq!(request_calls, [(10, true), (10, false), (10, true), (10, true)]);
}

#[tokio::test]
async fn start_windows_apply_per_kind() {
    let destination = Arc::new(MockDestination::new());
    let mut requests = requests(5, 3);
    for (i, request) in requests.iter_mut().enumerate() {
        request.creator = Some(RawCreatorRef {
            id: Some(creator_address(20 + i % 3)),
        });
    }
    let mut settings = settings(Mode::Migrate, 23, 5);
    settings.creator_start_window = 2;
    let indexer = MockIndexer::new()
        .with_creators(creators(23))
        .with_requests(requests);

    let summary = runner(indexer, destination.clone(), settings)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.failed_windows(), 0);
    assert_eq!(destination.creator_count(), 3);
    assert_eq!(destination.request_count(), 5);
}

#[tokio::test]
async fn verify_mode_makes_no_destination_calls() {
    let destination = Arc::new(MockDestination::new());

    let summary = runner(
        MockIndexer::new().with_creators(creators(5)),
        destination.clone(),
        settings(Mode::Verify, 0, 0),
    )
    .run()
    .await
    .unwrap();

    assert!(summary.migrations.is_empty());
    assert_eq!(summary.unverified(), 5);
    assert!(destination.calls().is_empty());
}

#[tokio::test]
async fn unauthorized_identity_aborts() {
    let destination = Arc::new(MockDestination::new());
    destination.revoke_authorization();

    let err = runner(
        MockIndexer::new().with_creators(creators(5)),
        destination,
        settings(Mode::Migrate, 5, 0),
    )
    .run()
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        MigratorError::MigrationError(MigrationError::Unauthorized { .. })
    ));
}
