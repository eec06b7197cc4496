use futures::future::join_all;
use ipfs::{ContentStore, PutOptions, StoreError};
use migration_shared::types::ContentBlob;

/// Put every blob concurrently and return their URIs in blob order.
///
/// Fan-out is bounded by the page length. All puts are awaited even after one
/// fails so no put is left running against the store; the first error wins.
pub async fn pin_blobs(
    store: &dyn ContentStore,
    blobs: &[ContentBlob],
    options: PutOptions,
) -> Result<Vec<String>, StoreError> {
    let puts = blobs
        .iter()
        .map(|blob| store.put(&blob.name, &blob.payload, options));

    join_all(puts).await.into_iter().collect()
}
