use serde::Serialize;
use serde_json::Value;

/// A JSON document destined for content-addressed storage.
///
/// The name is only used for store-side bookkeeping; the store derives the
/// address from the payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentBlob {
    pub name: String,
    pub payload: Value,
}

impl ContentBlob {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}
