use serde::{Deserialize, Serialize};

/// The two entity kinds carried over from the indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Creator,
    Request,
}

impl EntityKind {
    /// Collection name of the entity on the indexer.
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Creator => "creators",
            EntityKind::Request => "requests",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Creator => write!(f, "creator"),
            EntityKind::Request => write!(f, "request"),
        }
    }
}
