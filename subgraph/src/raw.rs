//! Record shapes as returned by the subgraph.
//!
//! Every attribute is optional here: the subgraph returns whatever was indexed,
//! and deciding which fields are required for migration belongs to the
//! transformer. BigInt attributes may arrive as JSON strings or numbers and are
//! kept as their decimal string.
use migration_shared::types::EntityKind;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCreator {
    pub id: Option<String>,
    pub address: Option<String>,
    pub token_address: Option<String>,
    pub twitter_handle: Option<String>,
    pub bio: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub delivery_time: Option<String>,
    #[serde(default)]
    pub demos: Option<Vec<String>>,
    pub profile_picture: Option<String>,
    pub user_name: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub price: Option<String>,
    pub tx_hash: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub block: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub timestamp: Option<String>,
}

/// The nested creator reference of a request. Only the id is selected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCreatorRef {
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRequest {
    pub id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub request_id: Option<String>,
    pub requester: Option<String>,
    pub creator: Option<RawCreatorRef>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub amount: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub deadline: Option<String>,
    pub delivered: Option<bool>,
    pub refunded: Option<bool>,
    pub token_address: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub token_id: Option<String>,
    pub token_uri: Option<String>,
    pub tx_hash: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub block: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub timestamp: Option<String>,
}

/// One record of a page, tagged with its entity kind.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    Creator(RawCreator),
    Request(RawRequest),
}

impl RawRecord {
    pub fn kind(&self) -> EntityKind {
        match self {
            RawRecord::Creator(_) => EntityKind::Creator,
            RawRecord::Request(_) => EntityKind::Request,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            RawRecord::Creator(creator) => creator.id.as_deref(),
            RawRecord::Request(request) => request.id.as_deref(),
        }
    }

    /// Ingestion timestamp used for ordering, if it parses.
    pub fn timestamp(&self) -> Option<u64> {
        let timestamp = match self {
            RawRecord::Creator(creator) => creator.timestamp.as_deref(),
            RawRecord::Request(request) => request.timestamp.as_deref(),
        };
        timestamp.and_then(|t| t.parse().ok())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}
