use crate::migration::MigrationError;
use std::borrow::Cow;

/// Failure of the underlying key-value store.
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("Rocksdb error: {0:#}")]
    RocksDB(#[from] rocksdb::Error),
    #[error("Bucket `{0}` does not exist")]
    BucketNotFound(&'static str),
    #[error("Failed to commit transaction: {0}")]
    CommitFailed(Cow<'static, str>),
    #[error("Inconsistent storage: {0}")]
    InconsistentStorage(Cow<'static, str>),
}

/// The bytes stored for a record do not match the layout expected by its codec.
#[derive(thiserror::Error, Debug)]
#[error("Malformed {kind} record: {source}")]
pub struct MalformedRecord {
    pub kind: &'static str,
    #[source]
    pub source: bincode::Error,
}

#[derive(thiserror::Error, Debug)]
pub enum DbError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    MalformedRecord(#[from] MalformedRecord),
    #[error("Failed to encode record: {0}")]
    Serialization(#[from] bincode::Error),
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error("Invoice sequence number overflowed")]
    InvoiceCounterOverflow,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
