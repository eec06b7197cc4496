use async_trait::async_trait;
use migration_shared::types::EntityKind;
use reqwest::Client as ReqwestClient;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use tracing::debug;

use crate::{validate_page, IndexerClient, IndexerError, RawCreator, RawRecord, RawRequest, Result};

const CREATORS_QUERY: &str = r#"
query GetCreators($first: Int!, $skip: Int!) {
    creators(first: $first, skip: $skip, orderBy: timestamp, orderDirection: asc) {
        id
        address
        tokenAddress
        twitterHandle
        bio
        deliveryTime
        demos
        profilePicture
        userName
        price
        txHash
        block
        timestamp
    }
}
"#;

const REQUESTS_QUERY: &str = r#"
query GetRequests($first: Int!, $skip: Int!) {
    requests(first: $first, skip: $skip, orderBy: timestamp, orderDirection: asc) {
        id
        requestId
        requester
        creator {
            id
        }
        amount
        description
        deadline
        delivered
        refunded
        tokenAddress
        tokenId
        tokenUri
        txHash
        block
        timestamp
    }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphError>,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct CreatorsData {
    creators: Vec<RawCreator>,
}

#[derive(Debug, Deserialize)]
struct RequestsData {
    requests: Vec<RawRequest>,
}

/// Production indexer client that queries a subgraph over HTTP.
///
/// # Example
///
/// ```ignore
/// use subgraph::GraphClient;
///
/// let client = GraphClient::new("https://api.thegraph.com/subgraphs/name/clipto", 1000);
/// ```
pub struct GraphClient {
    url: String,
    max_page_size: usize,
    client: ReqwestClient,
}

impl GraphClient {
    pub fn new(url: &str, max_page_size: usize) -> Self {
        GraphClient {
            url: url.to_string(),
            max_page_size,
            client: ReqwestClient::new(),
        }
    }

    async fn query<T: DeserializeOwned>(
        &self,
        kind: EntityKind,
        query: &str,
        page_size: usize,
        offset: usize,
    ) -> Result<T> {
        let failed = |reason: String| IndexerError::fetch_failed(kind, page_size, offset, reason);

        let body = json!({
            "query": query,
            "variables": { "first": page_size, "skip": offset },
        });

        let res = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            return Err(failed(format!("indexer responded with {status}")));
        }

        let response: GraphResponse<T> = res
            .json()
            .await
            .map_err(|e| failed(format!("malformed response: {e}")))?;

        if !response.errors.is_empty() {
            let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
            return Err(failed(messages.join("; ")));
        }

        response
            .data
            .ok_or_else(|| failed("response carried no data".to_string()))
    }
}

#[async_trait]
impl IndexerClient for GraphClient {
    fn max_page_size(&self) -> usize {
        self.max_page_size
    }

    async fn fetch_page(
        &self,
        kind: EntityKind,
        page_size: usize,
        offset: usize,
    ) -> Result<Vec<RawRecord>> {
        validate_page(page_size, offset, self.max_page_size)?;

        debug!(%kind, page_size, offset, "Querying indexer");

        let records = match kind {
            EntityKind::Creator => self
                .query::<CreatorsData>(kind, CREATORS_QUERY, page_size, offset)
                .await?
                .creators
                .into_iter()
                .map(RawRecord::Creator)
                .collect(),
            EntityKind::Request => self
                .query::<RequestsData>(kind, REQUESTS_QUERY, page_size, offset)
                .await?
                .requests
                .into_iter()
                .map(RawRecord::Request)
                .collect(),
        };

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_response_with_errors_parses() {
        let response: GraphResponse<CreatorsData> = serde_json::from_value(json!({
            "errors": [{ "message": "first must be <= 1000" }]
        }))
        .unwrap();

        assert!(response.data.is_none());
        assert_eq!(response.errors[0].message, "first must be <= 1000");
    }

    #[test]
    fn graph_response_with_requests_parses() {
        let response: GraphResponse<RequestsData> = serde_json::from_value(json!({
            "data": { "requests": [{ "id": "0xabc-0", "creator": { "id": "0xabc" } }] }
        }))
        .unwrap();

        let data = response.data.unwrap();
        assert_eq!(data.requests.len(), 1);
        assert!(response.errors.is_empty());
    }

    #[test]
    fn queries_order_by_timestamp_ascending() {
        assert!(CREATORS_QUERY.contains("orderBy: timestamp, orderDirection: asc"));
        assert!(REQUESTS_QUERY.contains("orderBy: timestamp, orderDirection: asc"));
    }

    #[tokio::test]
    async fn oversized_page_is_rejected_before_any_request() {
        let client = GraphClient::new("http://127.0.0.1:9/unreachable", 100);

        let err = client
            .fetch_page(EntityKind::Creator, 101, 0)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            IndexerError::PageSizeExceeded {
                requested: 101,
                max: 100
            }
        );
    }
}
