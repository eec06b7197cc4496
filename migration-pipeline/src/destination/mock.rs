//! In-memory destination for tests and dry runs.
//!
//! Behaves like the live contract where the pipeline can observe it: calls
//! are numbered by a nonce, a call is applied atomically or not at all, a
//! creator can only be migrated once, and request indexes are assigned per
//! creator in call order. Overlapping mutating calls are counted so tests can
//! assert that the submitter never has two in flight.
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use migration_shared::types::{CreatorBatchArgs, EntityKind, RequestBatchArgs};

use super::{CreatorView, Destination, RequestView, Result};
use crate::errors::DestinationError;

/// One mutating call as seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationCall {
    pub nonce: u64,
    pub kind: EntityKind,
    pub records: usize,
    pub accepted: bool,
}

#[derive(Default)]
struct State {
    creators: HashMap<String, CreatorView>,
    requests: HashMap<(String, u64), RequestView>,
    next_request_index: HashMap<String, u64>,
    nonce: u64,
    rejected_nonces: HashSet<u64>,
    unauthorized: bool,
    unreachable: bool,
    calls: Vec<DestinationCall>,
}

pub struct MockDestination {
    state: Mutex<State>,
    call_delay: Option<Duration>,
    in_flight: AtomicBool,
    overlaps: AtomicUsize,
}

impl MockDestination {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            call_delay: None,
            in_flight: AtomicBool::new(false),
            overlaps: AtomicUsize::new(0),
        }
    }

    /// Hold every mutating call open for `delay` before applying it.
    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = Some(delay);
        self
    }

    /// Reject the mutating call numbered `nonce` (0-based).
    pub fn fail_call(&self, nonce: u64) {
        self.state().rejected_nonces.insert(nonce);
    }

    /// Reject every mutating call as coming from an unauthorized identity.
    pub fn revoke_authorization(&self) {
        self.state().unauthorized = true;
    }

    /// Make every call, reads included, fail as unreachable.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state().unreachable = unreachable;
    }

    /// Write a creator directly, bypassing the call log.
    pub fn insert_creator(&self, address: &str, view: CreatorView) {
        self.state().creators.insert(address.to_string(), view);
    }

    pub fn calls(&self) -> Vec<DestinationCall> {
        self.state().calls.clone()
    }

    pub fn creator_count(&self) -> usize {
        self.state().creators.len()
    }

    pub fn request_count(&self) -> usize {
        self.state().requests.len()
    }

    /// Number of mutating calls that started while another was in flight.
    pub fn overlapping_calls(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn call<F>(&self, kind: EntityKind, records: usize, apply: F) -> Result<()>
    where
        F: FnOnce(&mut State) -> Result<()>,
    {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        if let Some(delay) = self.call_delay {
            tokio::time::sleep(delay).await;
        }

        let result = {
            let mut state = self.state();
            let nonce = state.nonce;
            state.nonce += 1;

            let result = if state.unreachable {
                Err(DestinationError::unreachable("mock destination offline"))
            } else if state.unauthorized {
                Err(DestinationError::unauthorized("caller is not the owner"))
            } else if state.rejected_nonces.contains(&nonce) {
                Err(DestinationError::rejected(format!("call {nonce} reverted")))
            } else {
                apply(&mut *state)
            };

            state.calls.push(DestinationCall {
                nonce,
                kind,
                records,
                accepted: result.is_ok(),
            });
            result
        };

        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    fn check_reachable(&self) -> Result<()> {
        if self.state().unreachable {
            return Err(DestinationError::unreachable("mock destination offline"));
        }
        Ok(())
    }
}

impl Default for MockDestination {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Destination for MockDestination {
    async fn migrate_creators(&self, args: &CreatorBatchArgs) -> Result<()> {
        self.call(EntityKind::Creator, args.len(), |state| {
            let mut seen = HashSet::new();
            for address in args.creator_addresses() {
                if state.creators.contains_key(address) || !seen.insert(address) {
                    return Err(DestinationError::rejected(format!(
                        "creator {address} already migrated"
                    )));
                }
            }

            let rows = args
                .creator_addresses()
                .iter()
                .zip(args.creator_names())
                .zip(args.metadata_uris());
            for ((address, name), uri) in rows {
                state.creators.insert(
                    address.clone(),
                    CreatorView {
                        name: name.clone(),
                        metadata_uri: uri.clone(),
                    },
                );
            }
            Ok(())
        })
        .await
    }

    async fn migrate_requests(&self, args: &RequestBatchArgs) -> Result<()> {
        self.call(EntityKind::Request, args.len(), |state| {
            if let Some(unknown) = args
                .creator_addresses()
                .iter()
                .find(|creator| !state.creators.contains_key(*creator))
            {
                return Err(DestinationError::rejected(format!(
                    "creator {unknown} not registered"
                )));
            }

            for i in 0..args.len() {
                let creator = &args.creator_addresses()[i];
                let index = state.next_request_index.entry(creator.clone()).or_insert(0);
                let request_id = *index;
                *index += 1;

                state.requests.insert(
                    (creator.clone(), request_id),
                    RequestView {
                        requester: args.requester_addresses()[i].clone(),
                        amount: args.amounts()[i],
                        fulfilled: args.fulfilled()[i],
                        metadata_uri: args.metadata_uris()[i].clone(),
                    },
                );
            }
            Ok(())
        })
        .await
    }

    async fn get_creator(&self, address: &str) -> Result<Option<CreatorView>> {
        self.check_reachable()?;
        Ok(self.state().creators.get(address).cloned())
    }

    async fn get_request(&self, creator: &str, request_id: u64) -> Result<Option<RequestView>> {
        self.check_reachable()?;
        Ok(self
            .state()
            .requests
            .get(&(creator.to_string(), request_id))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;

    fn creators(addresses: &[&str]) -> CreatorBatchArgs {
        CreatorBatchArgs::from_columns(
            addresses.iter().map(|a| a.to_string()).collect(),
            addresses.iter().map(|a| format!("name-{a}")).collect(),
            addresses.iter().map(|a| format!("ipfs://{a}")).collect(),
        )
        .unwrap()
    }

    fn requests(creator: &str, count: usize) -> RequestBatchArgs {
        RequestBatchArgs::from_columns(
            vec![creator.to_string(); count],
            vec!["0xrequester".to_string(); count],
            (0..count).map(|i| U256::from(i as u64 + 1)).collect(),
            vec![false; count],
            (0..count).map(|i| format!("ipfs://r{i}")).collect(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn migrated_creators_are_readable() {
        let destination = MockDestination::new();

        destination
            .migrate_creators(&creators(&["0xaa", "0xbb"]))
            .await
            .unwrap();

        let view = destination.get_creator("0xbb").await.unwrap().unwrap();
        assert_eq!(view.name, "name-0xbb");
        assert_eq!(view.metadata_uri, "ipfs://0xbb");
        assert!(destination.get_creator("0xcc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_creator_rejects_whole_call() {
        let destination = MockDestination::new();
        destination.migrate_creators(&creators(&["0xaa"])).await.unwrap();

        let err = destination
            .migrate_creators(&creators(&["0xbb", "0xaa"]))
            .await
            .unwrap_err();

        assert!(matches!(err, DestinationError::Rejected(_)));
        assert!(destination.get_creator("0xbb").await.unwrap().is_none());
        assert_eq!(destination.creator_count(), 1);
    }

    #[tokio::test]
    async fn failed_nonce_is_rejected_and_logged() {
        let destination = MockDestination::new();
        destination.fail_call(1);

        destination.migrate_creators(&creators(&["0xaa"])).await.unwrap();
        let err = destination
            .migrate_creators(&creators(&["0xbb"]))
            .await
            .unwrap_err();
        destination.migrate_creators(&creators(&["0xcc"])).await.unwrap();

        assert!(matches!(err, DestinationError::Rejected(_)));
        let accepted: Vec<bool> = destination.calls().iter().map(|c| c.accepted).collect();
        assert_eq!(accepted, [true, false, true]);
    }

    #[tokio::test]
    async fn request_indexes_are_per_creator() {
        let destination = MockDestination::new();
        destination.migrate_creators(&creators(&["0xaa"])).await.unwrap();

        destination.migrate_requests(&requests("0xaa", 2)).await.unwrap();
        destination.migrate_requests(&requests("0xaa", 1)).await.unwrap();

        assert_eq!(destination.request_count(), 3);
        let third = destination.get_request("0xaa", 2).await.unwrap().unwrap();
        assert_eq!(third.amount, U256::from(1u64));
        assert_eq!(third.metadata_uri, "ipfs://r0");
    }

    #[tokio::test]
    async fn requests_for_unknown_creator_are_rejected() {
        let destination = MockDestination::new();

        let err = destination
            .migrate_requests(&requests("0xaa", 1))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("not registered"));
    }

    #[tokio::test]
    async fn revoked_identity_is_fatal() {
        let destination = MockDestination::new();
        destination.revoke_authorization();

        let err = destination
            .migrate_creators(&creators(&["0xaa"]))
            .await
            .unwrap_err();

        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn unreachable_fails_reads() {
        let destination = MockDestination::new();
        destination.set_unreachable(true);

        let err = destination.get_creator("0xaa").await.unwrap_err();
        assert!(matches!(err, DestinationError::Unreachable(_)));
    }

    #[tokio::test]
    async fn concurrent_calls_are_detected() {
        let destination = MockDestination::new().with_call_delay(Duration::from_millis(20));
        let a = creators(&["0xaa"]);
        let b = creators(&["0xbb"]);

        let (first, second) = tokio::join!(
            destination.migrate_creators(&a),
            destination.migrate_creators(&b)
        );

        assert!(first.is_ok() && second.is_ok());
        assert_eq!(destination.overlapping_calls(), 1);
    }
}
