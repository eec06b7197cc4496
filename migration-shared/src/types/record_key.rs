use crate::types::EntityKind;

/// Key of a migrated record on the destination.
///
/// Creators are keyed by their normalized address, requests by the creator
/// address and the request index under that creator. The `Display` form is
/// also the blob name, so it is unique across a whole migration run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKey {
    Creator { address: String },
    Request { creator: String, request_id: u64 },
}

impl RecordKey {
    pub fn kind(&self) -> EntityKind {
        match self {
            RecordKey::Creator { .. } => EntityKind::Creator,
            RecordKey::Request { .. } => EntityKind::Request,
        }
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKey::Creator { address } => write!(f, "{address}"),
            RecordKey::Request {
                creator,
                request_id,
            } => write!(f, "{creator}-{request_id}"),
        }
    }
}
