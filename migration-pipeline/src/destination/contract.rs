//! Live destination: the migration entry points of the exchange contract.
//!
//! Signing, nonce management and fee estimation are left to the provider's
//! fillers. Each mutating call waits for its receipt before returning.
use alloy::network::ReceiptResponse;
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::transports::http::reqwest::Url;
use alloy::transports::RpcError;
use async_trait::async_trait;
use migration_shared::normalize_address;
use migration_shared::types::{CreatorBatchArgs, RequestBatchArgs};
use tracing::{debug, info};

use super::{classify_failure, CreatorView, Destination, RequestView, Result};
use crate::errors::DestinationError;

sol! {
    #[sol(rpc)]
    interface IMigrationTarget {
        struct MigratedCreator {
            bool exists;
            string name;
            string metadataUri;
        }

        struct MigratedRequest {
            bool exists;
            address requester;
            uint256 amount;
            bool fulfilled;
            string metadataUri;
        }

        function migrateCreator(address[] creators, string[] names, string[] metadataUris) external;

        function migrateRequest(
            address[] creators,
            address[] requesters,
            uint256[] amounts,
            bool[] fulfilled,
            string[] metadataUris
        ) external;

        function migratedCreator(address creator) external view returns (MigratedCreator memory);

        function migratedRequest(address creator, uint256 index) external view returns (MigratedRequest memory);
    }
}

pub struct ContractDestination {
    contract: IMigrationTarget::IMigrationTargetInstance<DynProvider>,
}

impl ContractDestination {
    /// Connect to `rpc_url` and sign as the holder of `private_key`.
    pub fn connect(rpc_url: &str, private_key: &str, contract_address: &str) -> Result<Self> {
        let url: Url = rpc_url
            .parse()
            .map_err(|e| DestinationError::unreachable(format!("invalid rpc url `{rpc_url}`: {e}")))?;
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|e| DestinationError::unauthorized(format!("invalid private key: {e}")))?;
        let address = parse_address(contract_address)?;

        info!(signer = %signer.address(), contract = %address, "Connecting to destination");

        let provider = ProviderBuilder::new()
            .wallet(signer)
            .connect_http(url)
            .erased();

        Ok(Self {
            contract: IMigrationTarget::new(address, provider),
        })
    }
}

#[async_trait]
impl Destination for ContractDestination {
    async fn migrate_creators(&self, args: &CreatorBatchArgs) -> Result<()> {
        let call = self.contract.migrateCreator(
            parse_addresses(args.creator_addresses())?,
            args.creator_names().to_vec(),
            args.metadata_uris().to_vec(),
        );
        let pending = call.send().await.map_err(call_error)?;
        confirm(pending).await
    }

    async fn migrate_requests(&self, args: &RequestBatchArgs) -> Result<()> {
        let call = self.contract.migrateRequest(
            parse_addresses(args.creator_addresses())?,
            parse_addresses(args.requester_addresses())?,
            args.amounts().to_vec(),
            args.fulfilled().to_vec(),
            args.metadata_uris().to_vec(),
        );
        let pending = call.send().await.map_err(call_error)?;
        confirm(pending).await
    }

    async fn get_creator(&self, address: &str) -> Result<Option<CreatorView>> {
        let creator = self
            .contract
            .migratedCreator(parse_address(address)?)
            .call()
            .await
            .map_err(call_error)?;

        Ok(creator.exists.then(|| CreatorView {
            name: creator.name,
            metadata_uri: creator.metadataUri,
        }))
    }

    async fn get_request(&self, creator: &str, request_id: u64) -> Result<Option<RequestView>> {
        let request = self
            .contract
            .migratedRequest(parse_address(creator)?, U256::from(request_id))
            .call()
            .await
            .map_err(call_error)?;

        Ok(request.exists.then(|| RequestView {
            requester: normalize_address(&request.requester.to_string()),
            amount: request.amount,
            fulfilled: request.fulfilled,
            metadata_uri: request.metadataUri,
        }))
    }
}

async fn confirm(
    pending: alloy::providers::PendingTransactionBuilder<alloy::network::Ethereum>,
) -> Result<()> {
    let tx_hash = *pending.tx_hash();
    debug!(%tx_hash, "Waiting for confirmation");

    let receipt = pending
        .get_receipt()
        .await
        .map_err(|e| DestinationError::unreachable(format!("{tx_hash} not confirmed: {e}")))?;

    if !receipt.status() {
        return Err(DestinationError::rejected(format!("{tx_hash} reverted")));
    }

    debug!(%tx_hash, block = ?receipt.block_number(), "Call confirmed");
    Ok(())
}

fn call_error(error: alloy::contract::Error) -> DestinationError {
    match error {
        alloy::contract::Error::TransportError(RpcError::ErrorResp(payload)) => {
            classify_failure(payload.message.to_string())
        }
        alloy::contract::Error::TransportError(other) => {
            DestinationError::unreachable(other.to_string())
        }
        other => classify_failure(other.to_string()),
    }
}

fn parse_address(address: &str) -> Result<Address> {
    address
        .parse()
        .map_err(|e| DestinationError::rejected(format!("invalid address `{address}`: {e}")))
}

fn parse_addresses(addresses: &[String]) -> Result<Vec<Address>> {
    addresses.iter().map(|a| parse_address(a)).collect()
}
