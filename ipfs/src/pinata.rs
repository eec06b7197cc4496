use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::{uri_from_cid, ContentStore, PutOptions, Result, StoreError};

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

#[derive(Debug, Deserialize)]
struct PinListResponse {
    #[serde(default)]
    rows: Vec<PinListRow>,
}

#[derive(Debug, Deserialize)]
struct PinListRow {
    ipfs_pin_hash: String,
}

/// Production content store backed by a Pinata-compatible pinning service.
///
/// Documents are pinned with `pinJSONToIPFS` as CIDv1, with the bookkeeping
/// name stored as pin metadata.
///
/// # Example
///
/// ```ignore
/// use ipfs::PinataClient;
///
/// let client = PinataClient::new("https://api.pinata.cloud", &key, &secret);
/// let uri = client.put("0xabc", &payload, PutOptions::default()).await?;
/// ```
pub struct PinataClient {
    url: String,
    api_key: String,
    api_secret: String,
    client: ReqwestClient,
}

impl PinataClient {
    pub fn new(url: &str, api_key: &str, api_secret: &str) -> Self {
        PinataClient {
            url: url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            client: ReqwestClient::new(),
        }
    }

    /// Look up a pin already stored under `name`.
    async fn find_by_name(&self, name: &str) -> Result<Option<String>> {
        let url = format!("{}/data/pinList", self.url);
        let res = self
            .client
            .get(&url)
            .header("pinata_api_key", &self.api_key)
            .header("pinata_secret_api_key", &self.api_secret)
            .query(&[("status", "pinned"), ("metadata[name]", name), ("pageLimit", "1")])
            .send()
            .await
            .map_err(|e| StoreError::unavailable(e.to_string()))?;

        let res = check_status(res).await?;
        let list: PinListResponse = res
            .json()
            .await
            .map_err(|e| StoreError::unavailable(format!("malformed pin list: {e}")))?;

        Ok(list.rows.into_iter().next().map(|row| row.ipfs_pin_hash))
    }

    async fn pin_json(&self, name: &str, payload: &Value) -> Result<String> {
        let url = format!("{}/pinning/pinJSONToIPFS", self.url);
        let body = json!({
            "pinataContent": payload,
            "pinataMetadata": { "name": name },
            "pinataOptions": { "cidVersion": 1 },
        });

        let res = self
            .client
            .post(&url)
            .header("pinata_api_key", &self.api_key)
            .header("pinata_secret_api_key", &self.api_secret)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::unavailable(e.to_string()))?;

        let res = check_status(res).await?;
        let pin: PinResponse = res
            .json()
            .await
            .map_err(|e| StoreError::unavailable(format!("malformed pin response: {e}")))?;

        Ok(pin.ipfs_hash)
    }
}

#[async_trait]
impl ContentStore for PinataClient {
    async fn put(&self, name: &str, payload: &Value, options: PutOptions) -> Result<String> {
        if options.reuse_by_name {
            if let Some(cid) = self.find_by_name(name).await? {
                debug!(blob = name, cid = %cid, "Reusing existing pin");
                return Ok(uri_from_cid(&cid));
            }
        }

        let cid = self.pin_json(name, payload).await?;
        info!(blob = name, cid = %cid, "Pinned metadata");

        Ok(uri_from_cid(&cid))
    }
}

/// Map a non-success response to a store error.
///
/// Client errors mean the payload or credentials were refused; anything else
/// is treated as the service being unavailable.
async fn check_status(res: reqwest::Response) -> Result<reqwest::Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let body = res.text().await.unwrap_or_default();
    Err(classify_status(status, body))
}

fn classify_status(status: StatusCode, body: String) -> StoreError {
    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
        StoreError::rejected(format!("{status}: {body}"))
    } else {
        StoreError::unavailable(format!("{status}: {body}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_rejections() {
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, "invalid json".to_string()),
            StoreError::StoreRejected(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, String::new()),
            StoreError::StoreRejected(_)
        ));
    }

    #[test]
    fn throttling_and_server_errors_are_unavailability() {
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            StoreError::StoreUnavailable(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, String::new()),
            StoreError::StoreUnavailable(_)
        ));
    }

    #[test]
    fn pin_response_parses() {
        let pin: PinResponse = serde_json::from_value(json!({
            "IpfsHash": "bafkreiabc",
            "PinSize": 120,
            "Timestamp": "2022-03-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(pin.ipfs_hash, "bafkreiabc");
    }

    #[test]
    fn pin_list_parses_first_row() {
        let list: PinListResponse = serde_json::from_value(json!({
            "count": 1,
            "rows": [{ "ipfs_pin_hash": "bafkreiabc", "metadata": { "name": "0xabc" } }]
        }))
        .unwrap();
        assert_eq!(list.rows[0].ipfs_pin_hash, "bafkreiabc");
    }

    #[tokio::test]
    async fn unreachable_service_is_unavailable() {
        let client = PinataClient::new("http://127.0.0.1:9", "key", "secret");

        let err = client
            .put("0xabc", &json!({}), PutOptions { reuse_by_name: false })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::StoreUnavailable(_)));
    }
}
