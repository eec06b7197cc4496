//! Dependency initialization and wiring for the migrator.
use std::sync::Arc;
use std::time::Duration;

use ipfs::ContentSource;
use migration_pipeline::{BatchSubmitter, ContractDestination, Destination, Verifier};
use subgraph::{GraphClient, IndexerClient};
use tracing::info;

use super::{ContentBackend, MigratorConfig};
use crate::runner::{RunSettings, Runner};
use crate::MigratorError;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Container for all initialized dependencies.
pub struct Dependencies {
    pub runner: Runner,
}

impl Dependencies {
    pub fn new(config: &MigratorConfig) -> Result<Self, MigratorError> {
        info!(
            graph_api_url = %config.graph_api_url,
            rpc_url = %config.destination.rpc_url,
            contract = %config.destination.contract_address,
            mode = ?config.mode,
            batch_size = config.batch_size,
            "Initializing dependencies"
        );

        let indexer: Arc<dyn IndexerClient> = Arc::new(GraphClient::new(
            &config.graph_api_url,
            config.indexer_max_page_size,
        ));

        let source = match &config.content {
            ContentBackend::Mock => ContentSource::mock(),
            ContentBackend::Pinata(pinata) => {
                ContentSource::pinata(&pinata.api_url, &pinata.api_key, &pinata.api_secret)
            }
        };
        let source = match &config.ipfs_mirror_url {
            Some(url) => source.with_mirror(url),
            None => source,
        };
        let store = source.into_store();

        let destination: Arc<dyn Destination> = Arc::new(ContractDestination::connect(
            &config.destination.rpc_url,
            &config.destination.private_key,
            &config.destination.contract_address,
        )?);

        let submitter = BatchSubmitter::new(indexer.clone(), store, destination.clone());
        let verifier = Verifier::new(destination).with_concurrency(config.verify_concurrency);

        let settings = RunSettings {
            mode: config.mode,
            batch_size: config.batch_size,
            creator_total: config.creator_total.unwrap_or(0),
            request_total: config.request_total.unwrap_or(0),
            creator_start_window: config.creator_start_window,
            request_start_window: config.request_start_window,
            retry_attempts: config.retry_failed_windows,
            retry_base_delay: RETRY_BASE_DELAY,
        };

        Ok(Self {
            runner: Runner::new(indexer, submitter, verifier, settings),
        })
    }
}
