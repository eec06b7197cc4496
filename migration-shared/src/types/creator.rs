
use crate::types::{Provenance, RecordKey};

/// A creator as read from the indexer, with its address fields normalized.
///
/// Records are snapshots taken at fetch time and are never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatorRecord {
    pub id: String,
    pub address: String,
    pub token_address: Option<String>,
    pub user_name: String,
    pub bio: Option<String>,
    pub twitter_handle: Option<String>,
    pub profile_picture: Option<String>,
    pub delivery_time: Option<String>,
    pub demos: Vec<String>,
    pub price: Option<String>,
    pub provenance: Provenance,
}

impl CreatorRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey::Creator {
            address: self.address.clone(),
        }
    }
}
