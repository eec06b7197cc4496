//! Settings read from the environment.
//!
//! Every value is looked up through a closure so the parsing can be tested
//! without touching the process environment.
use std::env;

use migration_pipeline::DEFAULT_VERIFY_CONCURRENCY;
use subgraph::DEFAULT_MAX_PAGE_SIZE;

use crate::MigratorError;

pub const DEFAULT_PINATA_API_URL: &str = "https://api.pinata.cloud";

pub const DEFAULT_BATCH_SIZE: usize = 10;

/// What a run does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Migrate,
    Verify,
    All,
}

impl Mode {
    pub fn migrates(self) -> bool {
        matches!(self, Mode::Migrate | Mode::All)
    }

    pub fn verifies(self) -> bool {
        matches!(self, Mode::Verify | Mode::All)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinataSettings {
    pub api_url: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Where metadata blobs go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBackend {
    /// In-memory store, for dry runs against a local chain.
    Mock,
    Pinata(PinataSettings),
}

#[derive(Clone, PartialEq, Eq)]
pub struct DestinationSettings {
    pub rpc_url: String,
    pub private_key: String,
    pub contract_address: String,
}

// Keeps the key out of logs.
impl std::fmt::Debug for DestinationSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DestinationSettings")
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &"<redacted>")
            .field("contract_address", &self.contract_address)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigratorConfig {
    pub graph_api_url: String,
    pub indexer_max_page_size: usize,
    pub content: ContentBackend,
    pub ipfs_mirror_url: Option<String>,
    pub destination: DestinationSettings,
    pub mode: Mode,
    pub batch_size: usize,
    /// Expected creator count. Required when the mode migrates.
    pub creator_total: Option<usize>,
    /// Expected request count. Required when the mode migrates.
    pub request_total: Option<usize>,
    /// First creator window to submit.
    pub creator_start_window: usize,
    /// First request window to submit. Independent of the creator window.
    pub request_start_window: usize,
    pub retry_failed_windows: usize,
    pub verify_concurrency: usize,
}

impl MigratorConfig {
    /// Load configuration from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `GRAPH_API_URL`: subgraph GraphQL endpoint (required)
    /// - `INDEXER_MAX_PAGE_SIZE`: indexer result-count ceiling (default: 1000)
    /// - `CONTENT_SOURCE`: "pinata" or "mock" (default: pinata)
    /// - `PINATA_API_URL`: pinning service URL (default: https://api.pinata.cloud)
    /// - `PINATA_API_KEY` / `PINATA_API_SECRET`: pinning credentials (required for pinata)
    /// - `IPFS_MIRROR_URL`: IPFS node to mirror pins to (optional)
    /// - `RPC_URL` / `PRIVATE_KEY` / `CONTRACT_ADDRESS`: destination (required)
    /// - `MIGRATION_MODE`: "migrate", "verify" or "all" (default: all)
    /// - `MIGRATION_BATCH_SIZE`: records per window (default: 10)
    /// - `CREATOR_TOTAL` / `REQUEST_TOTAL`: expected totals (required to migrate)
    /// - `CREATOR_START_WINDOW` / `REQUEST_START_WINDOW`: first window to submit per kind (default: 0)
    /// - `RETRY_FAILED_WINDOWS`: retry attempts per failed window (default: 0)
    /// - `VERIFY_CONCURRENCY`: concurrent verification reads (default: 20)
    pub fn from_env() -> Result<Self, MigratorError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, MigratorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| {
            var(key).ok_or_else(|| MigratorError::config(format!("{key} must be set")))
        };
        let number = |key: &str| -> Result<Option<usize>, MigratorError> {
            var(key)
                .map(|value| {
                    value.trim().parse::<usize>().map_err(|e| {
                        MigratorError::config(format!("{key}=`{value}` is not a count: {e}"))
                    })
                })
                .transpose()
        };

        let mode = match var("MIGRATION_MODE").map(|m| m.to_lowercase()).as_deref() {
            None | Some("all") => Mode::All,
            Some("migrate") => Mode::Migrate,
            Some("verify") => Mode::Verify,
            Some(other) => {
                return Err(MigratorError::config(format!(
                    "MIGRATION_MODE must be migrate, verify or all, got `{other}`"
                )))
            }
        };

        let content = match var("CONTENT_SOURCE").map(|s| s.to_lowercase()).as_deref() {
            None | Some("pinata") => ContentBackend::Pinata(PinataSettings {
                api_url: var("PINATA_API_URL")
                    .unwrap_or_else(|| DEFAULT_PINATA_API_URL.to_string()),
                api_key: required("PINATA_API_KEY")?,
                api_secret: required("PINATA_API_SECRET")?,
            }),
            Some("mock") => ContentBackend::Mock,
            Some(other) => {
                return Err(MigratorError::config(format!(
                    "CONTENT_SOURCE must be pinata or mock, got `{other}`"
                )))
            }
        };

        let config = Self {
            graph_api_url: required("GRAPH_API_URL")?,
            indexer_max_page_size: number("INDEXER_MAX_PAGE_SIZE")?.unwrap_or(DEFAULT_MAX_PAGE_SIZE),
            content,
            ipfs_mirror_url: var("IPFS_MIRROR_URL"),
            destination: DestinationSettings {
                rpc_url: required("RPC_URL")?,
                private_key: required("PRIVATE_KEY")?,
                contract_address: required("CONTRACT_ADDRESS")?,
            },
            mode,
            batch_size: number("MIGRATION_BATCH_SIZE")?.unwrap_or(DEFAULT_BATCH_SIZE),
            creator_total: number("CREATOR_TOTAL")?,
            request_total: number("REQUEST_TOTAL")?,
            creator_start_window: number("CREATOR_START_WINDOW")?.unwrap_or(0),
            request_start_window: number("REQUEST_START_WINDOW")?.unwrap_or(0),
            retry_failed_windows: number("RETRY_FAILED_WINDOWS")?.unwrap_or(0),
            verify_concurrency: number("VERIFY_CONCURRENCY")?
                .unwrap_or(DEFAULT_VERIFY_CONCURRENCY),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), MigratorError> {
        if self.batch_size == 0 || self.batch_size > self.indexer_max_page_size {
            return Err(MigratorError::config(format!(
                "MIGRATION_BATCH_SIZE must be between 1 and {}, got {}",
                self.indexer_max_page_size, self.batch_size
            )));
        }
        if self.mode.migrates() && (self.creator_total.is_none() || self.request_total.is_none()) {
            return Err(MigratorError::config(
                "CREATOR_TOTAL and REQUEST_TOTAL must be set to migrate",
            ));
        }
        if self.verify_concurrency == 0 {
            return Err(MigratorError::config("VERIFY_CONCURRENCY must be positive"));
        }
        Ok(())
    }
}
