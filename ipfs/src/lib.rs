//! Content-addressed storage for migration metadata.
//!
//! This crate provides:
//! - [`ContentStore`] trait for putting named JSON documents and getting back
//!   a content URI
//! - [`PinataClient`] production store backed by a pinning service
//! - [`KuboMirror`] best-effort mirror that asks a second IPFS node to pin the
//!   same content by hash
//! - [`PinnedStore`] which composes a primary store with an optional mirror
//! - [`MockContentStore`] in-memory content-addressed store for testing
//!
//! ## Usage with ContentSource (Recommended)
//!
//! ```ignore
//! use ipfs::ContentSource;
//!
//! // Development/testing: in-memory store
//! let store = ContentSource::mock().into_store();
//!
//! // Production: pinning service, optionally mirrored to an IPFS node
//! let store = ContentSource::pinata("https://api.pinata.cloud", key, secret)
//!     .with_mirror("http://127.0.0.1:5001")
//!     .into_store();
//!
//! let uri = store.put("0xabc", &json!({"userName": "alice"}), PutOptions::default()).await?;
//! ```
//!
//! Store calls are fallible and never retried here.

mod mirror;
mod mock;
mod pinata;

pub use mirror::{KuboMirror, MockMirror};
pub use mock::MockContentStore;
pub use pinata::PinataClient;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

/// URI scheme of every address this crate hands out.
pub const URI_SCHEME: &str = "ipfs";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("content store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("content store rejected payload: {0}")]
    StoreRejected(String),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::StoreRejected(msg.into())
    }
}

/// Failure of the mirror side channel. Never propagated to a `put` caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("mirror pin of {cid} failed: {reason}")]
pub struct MirrorError {
    pub cid: String,
    pub reason: String,
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Per-call options for [`ContentStore::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutOptions {
    /// Reuse the address already pinned under the same name instead of
    /// pinning again, so re-runs do not diverge.
    pub reuse_by_name: bool,
}

impl Default for PutOptions {
    fn default() -> Self {
        Self {
            reuse_by_name: true,
        }
    }
}

/// Trait for putting JSON documents into content-addressed storage.
///
/// Implementations hold no state shared with other callers and may be
/// invoked concurrently.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `payload` under the bookkeeping `name` and return its URI,
    /// `ipfs://<content-hash>`.
    async fn put(&self, name: &str, payload: &Value, options: PutOptions) -> Result<String>;
}

/// Trait for asking a secondary service to also retain content by hash.
#[async_trait]
pub trait MirrorPin: Send + Sync {
    async fn pin(&self, cid: &str) -> std::result::Result<(), MirrorError>;
}

/// A primary store plus an optional best-effort mirror.
///
/// The mirror runs after a successful primary put; its failure is logged and
/// the primary URI is still returned.
pub struct PinnedStore {
    primary: Arc<dyn ContentStore>,
    mirror: Option<Arc<dyn MirrorPin>>,
}

impl PinnedStore {
    pub fn new(primary: Arc<dyn ContentStore>) -> Self {
        Self {
            primary,
            mirror: None,
        }
    }

    pub fn with_mirror(mut self, mirror: Arc<dyn MirrorPin>) -> Self {
        self.mirror = Some(mirror);
        self
    }
}

#[async_trait]
impl ContentStore for PinnedStore {
    async fn put(&self, name: &str, payload: &Value, options: PutOptions) -> Result<String> {
        let uri = self.primary.put(name, payload, options).await?;

        if let Some(mirror) = &self.mirror {
            if let Err(error) = mirror.pin(cid_from_uri(&uri)).await {
                warn!(blob = name, uri = %uri, error = %error, "Mirror pin failed");
            }
        }

        Ok(uri)
    }
}

/// Build an `ipfs://` URI from a content hash.
pub fn uri_from_cid(cid: &str) -> String {
    format!("{URI_SCHEME}://{cid}")
}

/// Strip the scheme from a content URI, if present.
pub fn cid_from_uri(uri: &str) -> &str {
    match uri.split_once("://") {
        Some((_, cid)) => cid,
        None => uri,
    }
}

/// Configuration for the content store backend.
///
/// Use this to explicitly choose between the in-memory store and the live
/// pinning service.
#[derive(Debug, Clone)]
pub enum ContentSource {
    /// In-memory content-addressed store.
    Mock,

    /// Pinning service, optionally mirrored to an IPFS node.
    Pinata {
        api_url: String,
        api_key: String,
        api_secret: String,
        mirror_url: Option<String>,
    },
}

impl ContentSource {
    pub fn mock() -> Self {
        Self::Mock
    }

    pub fn pinata(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self::Pinata {
            api_url: api_url.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            mirror_url: None,
        }
    }

    /// Mirror every successful pin to the IPFS node at `url`.
    ///
    /// Has no effect on the mock source.
    pub fn with_mirror(self, url: impl Into<String>) -> Self {
        match self {
            Self::Pinata {
                api_url,
                api_key,
                api_secret,
                ..
            } => Self::Pinata {
                api_url,
                api_key,
                api_secret,
                mirror_url: Some(url.into()),
            },
            Self::Mock => Self::Mock,
        }
    }

    /// Create the appropriate ContentStore implementation.
    pub fn into_store(self) -> Arc<dyn ContentStore> {
        match self {
            Self::Mock => Arc::new(MockContentStore::new()),
            Self::Pinata {
                api_url,
                api_key,
                api_secret,
                mirror_url,
            } => {
                let primary = Arc::new(PinataClient::new(&api_url, &api_key, &api_secret));
                let store = PinnedStore::new(primary);
                match mirror_url {
                    Some(url) => Arc::new(store.with_mirror(Arc::new(KuboMirror::new(&url)))),
                    None => Arc::new(store),
                }
            }
        }
    }
}
