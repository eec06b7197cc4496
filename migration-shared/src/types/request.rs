use alloy::primitives::U256;

use crate::types::RecordKey;

/// Where a record came from on the source chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provenance {
    pub tx_hash: Option<String>,
    pub block: Option<String>,
    pub timestamp: Option<String>,
}

/// Non-fungible asset backing a request, when there is one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRef {
    pub token_id: String,
    pub token_uri: Option<String>,
    pub token_address: Option<String>,
}

/// A request as read from the indexer.
///
/// The creator relationship is held by address. The indexer nests it as an
/// object carrying only an id; that id is flattened into `creator` before a
/// record is built.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestRecord {
    pub id: String,
    pub request_id: u64,
    pub creator: String,
    pub requester: String,
    pub amount: U256,
    pub delivered: bool,
    pub refunded: bool,
    pub description: Option<String>,
    pub deadline: Option<String>,
    pub token: Option<TokenRef>,
    pub provenance: Provenance,
}

impl RequestRecord {
    /// A request is fulfilled once it was either delivered or refunded.
    pub fn fulfilled(&self) -> bool {
        self.delivered || self.refunded
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::Request {
            creator: self.creator.clone(),
            request_id: self.request_id,
        }
    }
}
