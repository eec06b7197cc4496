//! Mock content store for testing and local development.
//!
//! The `MockContentStore` derives addresses from the SHA-256 of the payload's
//! canonical JSON bytes, so identical content always maps to the same URI.
//! Individual names can be made to fail to exercise the caller's handling.
//!
//! # Example
//!
//! ```ignore
//! use ipfs::{ContentStore, MockContentStore, PutOptions};
//!
//! let store = MockContentStore::new();
//! let uri = store.put("0xabc", &json!({"bio": "hi"}), PutOptions::default()).await?;
//! assert!(store.has_uri(&uri));
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::{cid_from_uri, uri_from_cid, ContentStore, PutOptions, Result, StoreError};

#[derive(Default)]
struct MockState {
    /// Map of content hash -> payload
    blobs: HashMap<String, Value>,
    /// Map of bookkeeping name -> content hash
    names: HashMap<String, String>,
    rejected_names: HashSet<String>,
    unavailable_names: HashSet<String>,
    puts: usize,
}

/// Mock store that keeps pinned documents in memory.
pub struct MockContentStore {
    state: RwLock<MockState>,
}

impl MockContentStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MockState::default()),
        }
    }

    /// Make every put under `name` fail with `StoreRejected`.
    pub fn reject_name(&self, name: &str) {
        self.write().rejected_names.insert(name.to_string());
    }

    /// Make every put under `name` fail with `StoreUnavailable`.
    pub fn fail_name(&self, name: &str) {
        self.write().unavailable_names.insert(name.to_string());
    }

    /// Check if a URI (or bare hash) is stored.
    pub fn has_uri(&self, uri: &str) -> bool {
        self.read().blobs.contains_key(cid_from_uri(uri))
    }

    /// Payload stored at a URI (or bare hash).
    pub fn get(&self, uri: &str) -> Option<Value> {
        self.read().blobs.get(cid_from_uri(uri)).cloned()
    }

    /// URI last pinned under `name`.
    pub fn uri_for_name(&self, name: &str) -> Option<String> {
        self.read().names.get(name).map(|cid| uri_from_cid(cid))
    }

    /// Number of distinct documents stored.
    pub fn len(&self) -> usize {
        self.read().blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().blobs.is_empty()
    }

    /// Number of successful puts, reused ones included.
    pub fn put_count(&self) -> usize {
        self.read().puts
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MockState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MockState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for MockContentStore {
    async fn put(&self, name: &str, payload: &Value, options: PutOptions) -> Result<String> {
        let mut state = self.write();

        if state.unavailable_names.contains(name) {
            return Err(StoreError::unavailable(format!("mock store down for {name}")));
        }
        if state.rejected_names.contains(name) {
            return Err(StoreError::rejected(format!("mock store refused {name}")));
        }

        if options.reuse_by_name {
            if let Some(cid) = state.names.get(name).cloned() {
                state.puts += 1;
                return Ok(uri_from_cid(&cid));
            }
        }

        let cid = content_hash(payload)?;
        state.blobs.insert(cid.clone(), payload.clone());
        state.names.insert(name.to_string(), cid.clone());
        state.puts += 1;

        Ok(uri_from_cid(&cid))
    }
}

/// Hex SHA-256 of the payload's JSON encoding with object keys sorted.
fn content_hash(payload: &Value) -> Result<String> {
    let bytes = serde_json::to_vec(&canonicalize(payload))
        .map_err(|e| StoreError::rejected(e.to_string()))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key.as_str()]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn identical_content_yields_identical_uri() {
        let store = MockContentStore::new();
        let options = PutOptions {
            reuse_by_name: false,
        };

        let first = store
            .put("a", &json!({ "bio": "hi", "price": "1" }), options)
            .await
            .unwrap();
        let second = store
            .put("b", &json!({ "price": "1", "bio": "hi" }), options)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn different_content_yields_different_uri() {
        let store = MockContentStore::new();

        let first = store
            .put("a", &json!({ "bio": "hi" }), PutOptions::default())
            .await
            .unwrap();
        let second = store
            .put("b", &json!({ "bio": "bye" }), PutOptions::default())
            .await
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(store.get(&second), Some(json!({ "bio": "bye" })));
    }

    #[tokio::test]
    async fn reuse_by_name_returns_existing_uri() {
        let store = MockContentStore::new();

        let first = store
            .put("0xabc", &json!({ "bio": "v1" }), PutOptions::default())
            .await
            .unwrap();
        let second = store
            .put("0xabc", &json!({ "bio": "v2" }), PutOptions::default())
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
        assert_eq!(store.uri_for_name("0xabc"), Some(first));
    }

    #[tokio::test]
    async fn configured_failures_surface_as_store_errors() {
        let store = MockContentStore::new();
        store.reject_name("bad");
        store.fail_name("down");

        let rejected = store.put("bad", &json!({}), PutOptions::default()).await;
        let unavailable = store.put("down", &json!({}), PutOptions::default()).await;

        assert!(matches!(rejected, Err(StoreError::StoreRejected(_))));
        assert!(matches!(unavailable, Err(StoreError::StoreUnavailable(_))));
        assert!(store.is_empty());
    }
}
