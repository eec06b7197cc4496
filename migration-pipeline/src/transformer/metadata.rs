//! Metadata documents pinned for each record.
//!
//! Whatever the destination call does not take positionally goes here.
use migration_shared::types::{CreatorRecord, RequestRecord};
use serde_json::{json, Value};

pub fn creator_metadata(creator: &CreatorRecord) -> Value {
    json!({
        "userName": creator.user_name,
        "twitterHandle": creator.twitter_handle,
        "profilePicture": creator.profile_picture,
        "bio": creator.bio,
        "deliveryTime": creator.delivery_time,
        "demos": creator.demos,
        "price": creator.price,
        "tokenAddress": creator.token_address,
        "txHash": creator.provenance.tx_hash,
        "block": creator.provenance.block,
        "timestamp": creator.provenance.timestamp,
    })
}

pub fn request_metadata(request: &RequestRecord) -> Value {
    let token = request.token.as_ref();

    json!({
        "requestId": request.request_id,
        "creator": request.creator,
        "tokenId": token.map(|t| t.token_id.clone()),
        "tokenUri": token.and_then(|t| t.token_uri.clone()),
        "tokenAddress": token.and_then(|t| t.token_address.clone()),
        "delivered": request.delivered,
        "refunded": request.refunded,
        "description": request.description,
        "deadline": request.deadline,
        "txHash": request.provenance.tx_hash,
        "block": request.provenance.block,
        "timestamp": request.provenance.timestamp,
    })
}
