//! Best-effort mirror pins.
//!
//! After the primary store accepts a document, a second IPFS node can be asked
//! to pin the same content by hash. Callers log mirror failures and move on.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use tracing::debug;

use crate::{MirrorError, MirrorPin};

/// Mirror that pins by hash on a Kubo node through its RPC API.
pub struct KuboMirror {
    url: String,
    client: ReqwestClient,
}

impl KuboMirror {
    pub fn new(url: &str) -> Self {
        KuboMirror {
            url: url.trim_end_matches('/').to_string(),
            client: ReqwestClient::new(),
        }
    }
}

#[async_trait]
impl MirrorPin for KuboMirror {
    async fn pin(&self, cid: &str) -> Result<(), MirrorError> {
        let failed = |reason: String| MirrorError {
            cid: cid.to_string(),
            reason,
        };

        let url = format!("{}/api/v0/pin/add", self.url);
        let res = self
            .client
            .post(&url)
            .query(&[("arg", cid)])
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            return Err(failed(format!("mirror responded with {status}")));
        }

        debug!(cid, "Mirrored pin");
        Ok(())
    }
}

/// Mirror that records the hashes it was asked to pin.
#[derive(Default)]
pub struct MockMirror {
    fail: bool,
    attempts: Mutex<Vec<String>>,
}

impl MockMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mirror whose every pin fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Every hash the mirror was asked to pin, in call order.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Hashes that were pinned successfully.
    pub fn pinned(&self) -> Vec<String> {
        if self.fail {
            Vec::new()
        } else {
            self.attempts()
        }
    }
}

#[async_trait]
impl MirrorPin for MockMirror {
    async fn pin(&self, cid: &str) -> Result<(), MirrorError> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(cid.to_string());

        if self.fail {
            return Err(MirrorError {
                cid: cid.to_string(),
                reason: "mock mirror unavailable".to_string(),
            });
        }
        Ok(())
    }
}
