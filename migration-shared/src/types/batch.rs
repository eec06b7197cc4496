//! Order-aligned argument vectors for the batched destination calls.
//!
//! The destination takes several same-length arrays per call instead of a list
//! of structs. Element `i` of every array must describe the same source record.
//! Batches are only built through [`MigrationBatchArgs::assemble`] and the
//! `from_columns` constructors, which check the lengths once for the whole
//! batch; the column vectors are never exposed mutably.
use alloy::primitives::U256;
use thiserror::Error;

use crate::types::{EntityKind, RecordKey};

/// Errors raised when the columns of a batch do not line up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchArgsError {
    #[error("column `{column}` has {actual} elements, expected {expected}")]
    LengthMismatch {
        column: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Positional arguments of one creator, before its metadata is pinned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatorRow {
    pub address: String,
    pub name: String,
}

/// Positional arguments of one request, before its metadata is pinned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRow {
    pub creator: String,
    pub requester: String,
    pub request_id: u64,
    pub amount: U256,
    pub fulfilled: bool,
}

/// The rows of one transformed page, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationRows {
    Creators(Vec<CreatorRow>),
    Requests(Vec<RequestRow>),
}

impl MigrationRows {
    pub fn kind(&self) -> EntityKind {
        match self {
            MigrationRows::Creators(_) => EntityKind::Creator,
            MigrationRows::Requests(_) => EntityKind::Request,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            MigrationRows::Creators(rows) => rows.len(),
            MigrationRows::Requests(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Destination keys of the rows, index-aligned with the rows.
    pub fn keys(&self) -> Vec<RecordKey> {
        match self {
            MigrationRows::Creators(rows) => rows
                .iter()
                .map(|row| RecordKey::Creator {
                    address: row.address.clone(),
                })
                .collect(),
            MigrationRows::Requests(rows) => rows
                .iter()
                .map(|row| RecordKey::Request {
                    creator: row.creator.clone(),
                    request_id: row.request_id,
                })
                .collect(),
        }
    }
}

/// Arguments of `migrateCreator(address[], string[], string[])`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatorBatchArgs {
    creator_addresses: Vec<String>,
    creator_names: Vec<String>,
    metadata_uris: Vec<String>,
}

impl CreatorBatchArgs {
    pub fn from_columns(
        creator_addresses: Vec<String>,
        creator_names: Vec<String>,
        metadata_uris: Vec<String>,
    ) -> Result<Self, BatchArgsError> {
        let expected = creator_addresses.len();
        check_len("creator_names", expected, creator_names.len())?;
        check_len("metadata_uris", expected, metadata_uris.len())?;

        Ok(Self {
            creator_addresses,
            creator_names,
            metadata_uris,
        })
    }

    pub fn creator_addresses(&self) -> &[String] {
        &self.creator_addresses
    }

    pub fn creator_names(&self) -> &[String] {
        &self.creator_names
    }

    pub fn metadata_uris(&self) -> &[String] {
        &self.metadata_uris
    }

    pub fn len(&self) -> usize {
        self.creator_addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creator_addresses.is_empty()
    }
}

/// Arguments of `migrateRequest(address[], address[], uint256[], bool[], string[])`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestBatchArgs {
    creator_addresses: Vec<String>,
    requester_addresses: Vec<String>,
    amounts: Vec<U256>,
    fulfilled: Vec<bool>,
    metadata_uris: Vec<String>,
}

impl RequestBatchArgs {
    pub fn from_columns(
        creator_addresses: Vec<String>,
        requester_addresses: Vec<String>,
        amounts: Vec<U256>,
        fulfilled: Vec<bool>,
        metadata_uris: Vec<String>,
    ) -> Result<Self, BatchArgsError> {
        let expected = creator_addresses.len();
        check_len("requester_addresses", expected, requester_addresses.len())?;
        check_len("amounts", expected, amounts.len())?;
        check_len("fulfilled", expected, fulfilled.len())?;
        check_len("metadata_uris", expected, metadata_uris.len())?;

        Ok(Self {
            creator_addresses,
            requester_addresses,
            amounts,
            fulfilled,
            metadata_uris,
        })
    }

    pub fn creator_addresses(&self) -> &[String] {
        &self.creator_addresses
    }

    pub fn requester_addresses(&self) -> &[String] {
        &self.requester_addresses
    }

    pub fn amounts(&self) -> &[U256] {
        &self.amounts
    }

    pub fn fulfilled(&self) -> &[bool] {
        &self.fulfilled
    }

    pub fn metadata_uris(&self) -> &[String] {
        &self.metadata_uris
    }

    pub fn len(&self) -> usize {
        self.creator_addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creator_addresses.is_empty()
    }
}

/// Arguments of one destination call, creator or request variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationBatchArgs {
    Creator(CreatorBatchArgs),
    Request(RequestBatchArgs),
}

impl MigrationBatchArgs {
    /// Builds the call arguments from transformed rows and the metadata URIs
    /// returned by the content store for those rows, in the same order.
    pub fn assemble(rows: MigrationRows, metadata_uris: Vec<String>) -> Result<Self, BatchArgsError> {
        check_len("metadata_uris", rows.len(), metadata_uris.len())?;

        let args = match rows {
            MigrationRows::Creators(rows) => {
                let (creator_addresses, creator_names) =
                    rows.into_iter().map(|row| (row.address, row.name)).unzip();
                MigrationBatchArgs::Creator(CreatorBatchArgs::from_columns(
                    creator_addresses,
                    creator_names,
                    metadata_uris,
                )?)
            }
            MigrationRows::Requests(rows) => {
                let mut creator_addresses = Vec::with_capacity(rows.len());
                let mut requester_addresses = Vec::with_capacity(rows.len());
                let mut amounts = Vec::with_capacity(rows.len());
                let mut fulfilled = Vec::with_capacity(rows.len());

                for row in rows {
                    creator_addresses.push(row.creator);
                    requester_addresses.push(row.requester);
                    amounts.push(row.amount);
                    fulfilled.push(row.fulfilled);
                }

                MigrationBatchArgs::Request(RequestBatchArgs::from_columns(
                    creator_addresses,
                    requester_addresses,
                    amounts,
                    fulfilled,
                    metadata_uris,
                )?)
            }
        };

        Ok(args)
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            MigrationBatchArgs::Creator(_) => EntityKind::Creator,
            MigrationBatchArgs::Request(_) => EntityKind::Request,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            MigrationBatchArgs::Creator(args) => args.len(),
            MigrationBatchArgs::Request(args) => args.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn check_len(column: &'static str, expected: usize, actual: usize) -> Result<(), BatchArgsError> {
    if expected != actual {
        return Err(BatchArgsError::LengthMismatch {
            column,
            expected,
            actual,
        });
    }
    Ok(())
}
