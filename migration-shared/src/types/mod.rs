mod batch;
mod blob;
mod creator;
mod entity_kind;
mod record_key;
mod request;

pub use batch::{
    BatchArgsError, CreatorBatchArgs, CreatorRow, MigrationBatchArgs, MigrationRows,
    RequestBatchArgs, RequestRow,
};
pub use blob::ContentBlob;
pub use creator::CreatorRecord;
pub use entity_kind::EntityKind;
pub use record_key::RecordKey;
pub use request::{Provenance, RequestRecord, TokenRef};
