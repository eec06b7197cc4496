//! Record transformer.
//!
//! Maps raw indexer records into index-aligned batch rows plus one metadata
//! blob per record. Output length always equals input length; a record that
//! cannot be transformed fails the whole page instead of being skipped, since
//! a skipped record would shift every later row against its source.
mod metadata;

pub use metadata::{creator_metadata, request_metadata};

use std::collections::BTreeSet;

use alloy::primitives::U256;
use migration_shared::types::{
    ContentBlob, CreatorRecord, CreatorRow, EntityKind, MigrationRows, Provenance, RequestRecord,
    RequestRow, TokenRef,
};
use migration_shared::{is_valid_address, normalize_address};
use subgraph::{RawCreator, RawRecord, RawRequest};

use crate::errors::TransformError;
use crate::verifier::SourceRecord;

/// Rows and blobs of one page, index-aligned with the input records.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedPage {
    pub rows: MigrationRows,
    pub blobs: Vec<ContentBlob>,
}

impl TransformedPage {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Transform a page of creators.
pub fn to_creator_batch(records: &[RawCreator]) -> Result<TransformedPage, TransformError> {
    let mut rows = Vec::with_capacity(records.len());
    let mut blobs = Vec::with_capacity(records.len());

    for (index, raw) in records.iter().enumerate() {
        let creator = creator_record(index, raw)?;
        blobs.push(ContentBlob::new(
            creator.key().to_string(),
            creator_metadata(&creator),
        ));
        rows.push(CreatorRow {
            address: creator.address,
            name: creator.user_name,
        });
    }

    Ok(TransformedPage {
        rows: MigrationRows::Creators(rows),
        blobs,
    })
}

/// Transform a page of requests.
pub fn to_request_batch(records: &[RawRequest]) -> Result<TransformedPage, TransformError> {
    let mut rows = Vec::with_capacity(records.len());
    let mut blobs = Vec::with_capacity(records.len());

    for (index, raw) in records.iter().enumerate() {
        let request = request_record(index, raw)?;
        blobs.push(ContentBlob::new(
            request.key().to_string(),
            request_metadata(&request),
        ));
        rows.push(RequestRow {
            fulfilled: request.fulfilled(),
            creator: request.creator,
            requester: request.requester,
            request_id: request.request_id,
            amount: request.amount,
        });
    }

    Ok(TransformedPage {
        rows: MigrationRows::Requests(rows),
        blobs,
    })
}

/// Transform a fetched page whose records must all be of `kind`.
pub fn transform_page(
    kind: EntityKind,
    records: &[RawRecord],
) -> Result<TransformedPage, TransformError> {
    match kind {
        EntityKind::Creator => {
            let creators = records
                .iter()
                .enumerate()
                .map(|(index, record)| match record {
                    RawRecord::Creator(creator) => Ok(creator.clone()),
                    other => Err(unexpected_kind(index, kind, other)),
                })
                .collect::<Result<Vec<_>, _>>()?;
            to_creator_batch(&creators)
        }
        EntityKind::Request => {
            let requests = records
                .iter()
                .enumerate()
                .map(|(index, record)| match record {
                    RawRecord::Request(request) => Ok(request.clone()),
                    other => Err(unexpected_kind(index, kind, other)),
                })
                .collect::<Result<Vec<_>, _>>()?;
            to_request_batch(&requests)
        }
    }
}

/// Normalize raw records into source records for verification.
pub fn source_records(records: &[RawRecord]) -> Result<Vec<SourceRecord>, TransformError> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| match record {
            RawRecord::Creator(raw) => creator_record(index, raw).map(SourceRecord::Creator),
            RawRecord::Request(raw) => request_record(index, raw).map(SourceRecord::Request),
        })
        .collect()
}

/// Validate and normalize one raw creator.
pub fn creator_record(index: usize, raw: &RawCreator) -> Result<CreatorRecord, TransformError> {
    let id = raw.id.as_deref();
    let invalid = |reason: &str| TransformError::invalid(index, id, reason);

    let address = required_address(raw.address.as_deref(), "address").map_err(|r| invalid(&r))?;
    let token_address = optional_address(raw.token_address.as_deref(), "tokenAddress")
        .map_err(|r| invalid(&r))?;
    let user_name = raw
        .user_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| invalid("missing userName"))?;

    Ok(CreatorRecord {
        id: raw.id.clone().unwrap_or_else(|| address.clone()),
        address,
        token_address,
        user_name,
        bio: raw.bio.clone(),
        twitter_handle: raw.twitter_handle.clone(),
        profile_picture: raw.profile_picture.clone(),
        delivery_time: raw.delivery_time.clone(),
        demos: raw.demos.clone().unwrap_or_default(),
        price: raw.price.clone(),
        provenance: Provenance {
            tx_hash: raw.tx_hash.clone(),
            block: raw.block.clone(),
            timestamp: raw.timestamp.clone(),
        },
    })
}

/// Validate and normalize one raw request, flattening its creator reference.
pub fn request_record(index: usize, raw: &RawRequest) -> Result<RequestRecord, TransformError> {
    let id = raw.id.as_deref();
    let invalid = |reason: &str| TransformError::invalid(index, id, reason);

    let id = raw.id.clone().ok_or_else(|| invalid("missing id"))?;
    let request_id = raw
        .request_id
        .as_deref()
        .ok_or_else(|| invalid("missing requestId"))?
        .parse::<u64>()
        .map_err(|e| invalid(&format!("invalid requestId: {e}")))?;
    let creator_id = raw.creator.as_ref().and_then(|creator| creator.id.as_deref());
    let creator = required_address(creator_id, "creator").map_err(|r| invalid(&r))?;
    let requester =
        required_address(raw.requester.as_deref(), "requester").map_err(|r| invalid(&r))?;
    let amount = raw
        .amount
        .as_deref()
        .ok_or_else(|| invalid("missing amount"))?
        .parse::<U256>()
        .map_err(|e| invalid(&format!("invalid amount: {e}")))?;
    let delivered = raw.delivered.ok_or_else(|| invalid("missing delivered"))?;
    let refunded = raw.refunded.ok_or_else(|| invalid("missing refunded"))?;

    let token = match raw.token_id.clone() {
        Some(token_id) => Some(TokenRef {
            token_id,
            token_uri: raw.token_uri.clone(),
            token_address: optional_address(raw.token_address.as_deref(), "tokenAddress")
                .map_err(|r| invalid(&r))?,
        }),
        None => None,
    };

    Ok(RequestRecord {
        id,
        request_id,
        creator,
        requester,
        amount,
        delivered,
        refunded,
        description: raw.description.clone(),
        deadline: raw.deadline.clone(),
        token,
        provenance: Provenance {
            tx_hash: raw.tx_hash.clone(),
            block: raw.block.clone(),
            timestamp: raw.timestamp.clone(),
        },
    })
}

/// Normalized creators referenced by a page of requests.
///
/// Requests without a valid creator can never be written, so they are left out.
pub fn request_creators(records: &[RawRecord]) -> BTreeSet<String> {
    records
        .iter()
        .filter_map(|record| match record {
            RawRecord::Request(raw) => raw.creator.as_ref()?.id.as_deref(),
            RawRecord::Creator(_) => None,
        })
        .filter_map(|id| required_address(Some(id), "creator").ok())
        .collect()
}

fn required_address(value: Option<&str>, field: &str) -> Result<String, String> {
    let value = value.ok_or_else(|| format!("missing {field}"))?;
    if !is_valid_address(value.trim()) {
        return Err(format!("invalid {field} address `{value}`"));
    }
    Ok(normalize_address(value))
}

fn optional_address(value: Option<&str>, field: &str) -> Result<Option<String>, String> {
    match value {
        Some(value) if !value.trim().is_empty() => required_address(Some(value), field).map(Some),
        _ => Ok(None),
    }
}

fn unexpected_kind(index: usize, expected: EntityKind, record: &RawRecord) -> TransformError {
    TransformError::UnexpectedKind {
        index,
        expected,
        actual: record.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subgraph::RawCreatorRef;

    const CREATOR: &str = "0xABCDEF0000000000000000000000000000000001";
    const REQUESTER: &str = "0x00000000000000000000000000000000DeaDBeef";

    fn raw_creator(address: &str, name: &str) -> RawCreator {
        RawCreator {
            id: Some(address.to_string()),
            address: Some(address.to_string()),
            token_address: Some("0x1111111111111111111111111111111111111111".to_string()),
            user_name: Some(name.to_string()),
            bio: Some("makes videos".to_string()),
            twitter_handle: Some("@creator".to_string()),
            price: Some("1000".to_string()),
            demos: Some(vec!["ipfs://demo".to_string()]),
            tx_hash: Some("0xfeed".to_string()),
            block: Some("10".to_string()),
            timestamp: Some("1650000000".to_string()),
            ..Default::default()
        }
    }

    fn raw_request(request_id: u64, delivered: bool, refunded: bool) -> RawRequest {
        RawRequest {
            id: Some(format!("{CREATOR}-{request_id}")),
            request_id: Some(request_id.to_string()),
            requester: Some(REQUESTER.to_string()),
            creator: Some(RawCreatorRef {
                id: Some(CREATOR.to_string()),
            }),
            amount: Some("250000000000000000".to_string()),
            description: Some("birthday shoutout".to_string()),
            deadline: Some("1650100000".to_string()),
            delivered: Some(delivered),
            refunded: Some(refunded),
            timestamp: Some("1650000100".to_string()),
            ..Default::default()
        }
    }

    fn creator_address(i: usize) -> String {
        format!("0x{:040X}", i + 0xA0)
    }

    #[test]
    fn creator_batch_is_index_aligned() {
        let raws: Vec<RawCreator> = (0..5)
            .map(|i| raw_creator(&creator_address(i), &format!("creator-{i}")))
            .collect();

        let page = to_creator_batch(&raws).unwrap();

        assert_eq!(page.len(), raws.len());
        assert_eq!(page.blobs.len(), raws.len());
        let MigrationRows::Creators(rows) = &page.rows else {
            panic!("expected creator rows");
        };
        for (i, (row, blob)) in rows.iter().zip(&page.blobs).enumerate() {
            let expected = creator_address(i).to_lowercase();
            assert_eq!(row.address, expected);
            assert_eq!(row.name, format!("creator-{i}"));
            assert_eq!(blob.name, expected);
            assert_eq!(blob.payload["userName"], format!("creator-{i}"));
        }
    }

    #[test]
    fn addresses_are_lowercased_everywhere() {
        let page = to_creator_batch(&[raw_creator(CREATOR, "alice")]).unwrap();
        let MigrationRows::Creators(rows) = &page.rows else {
            panic!("expected creator rows");
        };
        assert_eq!(rows[0].address, CREATOR.to_lowercase());
        assert_eq!(page.blobs[0].name, CREATOR.to_lowercase());

        let page = to_request_batch(&[raw_request(0, false, false)]).unwrap();
        let MigrationRows::Requests(rows) = &page.rows else {
            panic!("expected request rows");
        };
        assert_eq!(rows[0].creator, CREATOR.to_lowercase());
        assert_eq!(rows[0].requester, REQUESTER.to_lowercase());
        assert_eq!(page.blobs[0].payload["creator"], CREATOR.to_lowercase());
    }

    #[test]
    fn fulfilled_is_delivered_or_refunded() {
        let raws = vec![
            raw_request(0, true, false),
            raw_request(1, false, false),
            raw_request(2, true, true),
            raw_request(3, false, true),
        ];

        let page = to_request_batch(&raws).unwrap();

        let MigrationRows::Requests(rows) = &page.rows else {
            panic!("expected request rows");
        };
        let fulfilled: Vec<bool> = rows.iter().map(|row| row.fulfilled).collect();
        assert_eq!(fulfilled, [true, false, true, true]);
    }

    #[test]
    fn request_blob_name_joins_creator_and_request_id() {
        let page = to_request_batch(&[raw_request(7, false, false)]).unwrap();

        assert_eq!(
            page.blobs[0].name,
            format!("{}-7", CREATOR.to_lowercase())
        );
        assert_eq!(page.blobs[0].payload["requestId"], 7);
        assert_eq!(page.blobs[0].payload["description"], "birthday shoutout");
    }

    #[test]
    fn nested_creator_reference_is_flattened() {
        let record = request_record(0, &raw_request(3, false, false)).unwrap();
        assert_eq!(record.creator, CREATOR.to_lowercase());
    }

    #[test]
    fn token_reference_attached_when_token_id_present() {
        let mut raw = raw_request(0, true, false);
        raw.token_id = Some("42".to_string());
        raw.token_uri = Some("ipfs://token".to_string());
        raw.token_address = Some("0x2222222222222222222222222222222222222222".to_string());

        let record = request_record(0, &raw).unwrap();
        let token = record.token.unwrap();
        assert_eq!(token.token_id, "42");
        assert_eq!(token.token_uri.as_deref(), Some("ipfs://token"));

        let plain = request_record(0, &raw_request(0, true, false)).unwrap();
        assert!(plain.token.is_none());
    }

    #[test]
    fn missing_required_field_fails_the_page() {
        let mut raws: Vec<RawCreator> = (0..3)
            .map(|i| raw_creator(&creator_address(i), "name"))
            .collect();
        raws[1].user_name = None;

        let err = to_creator_batch(&raws).unwrap_err();

        assert!(matches!(
            err,
            TransformError::TransformInvalid { index: 1, .. }
        ));
    }

    #[test]
    fn malformed_address_is_invalid() {
        let err = to_creator_batch(&[raw_creator("0x1234", "alice")]).unwrap_err();
        assert!(matches!(err, TransformError::TransformInvalid { index: 0, .. }));
    }

    #[test]
    fn missing_creator_reference_is_invalid() {
        let mut raw = raw_request(0, false, false);
        raw.creator = Some(RawCreatorRef { id: None });

        let err = to_request_batch(&[raw]).unwrap_err();
        assert!(err.to_string().contains("missing creator"));
    }

    #[test]
    fn unparseable_amount_is_invalid() {
        let mut raw = raw_request(0, false, false);
        raw.amount = Some("lots".to_string());

        assert!(to_request_batch(&[raw]).is_err());
    }

    #[test]
    fn transform_page_rejects_mixed_kinds() {
        let records = vec![
            RawRecord::Creator(raw_creator(CREATOR, "alice")),
            RawRecord::Request(raw_request(0, false, false)),
        ];

        let err = transform_page(EntityKind::Creator, &records).unwrap_err();

        assert_eq!(
            err,
            TransformError::UnexpectedKind {
                index: 1,
                expected: EntityKind::Creator,
                actual: EntityKind::Request,
            }
        );
    }

    #[test]
    fn request_creators_are_normalized_and_skip_invalid_refs() {
        let mut orphan = raw_request(1, false, false);
        orphan.creator = None;
        let mut malformed = raw_request(2, false, false);
        malformed.creator = Some(RawCreatorRef {
            id: Some("not-an-address".to_string()),
        });
        let records = vec![
            RawRecord::Request(raw_request(0, false, false)),
            RawRecord::Request(orphan),
            RawRecord::Request(malformed),
            RawRecord::Request(raw_request(3, true, false)),
        ];

        let creators = request_creators(&records);

        assert_eq!(creators.len(), 1);
        assert!(creators.contains(&CREATOR.to_lowercase()));
    }

    #[test]
    fn empty_page_transforms_to_empty_batch() {
        let page = transform_page(EntityKind::Request, &[]).unwrap();
        assert!(page.is_empty());
        assert!(page.blobs.is_empty());
    }
}
