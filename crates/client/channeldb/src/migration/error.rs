use crate::error::{MalformedRecord, StorageError};
use lp_invoice::PaymentRequestError;

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Database version {db_version} is newer than binary supports ({binary_version}). Refusing to revert.")]
    DatabaseNewerThanBinary { db_version: u32, binary_version: u32 },

    #[error("Invalid migration registry: {0}")]
    InvalidRegistry(String),

    #[error("No migration registered for v{from} -> v{to}")]
    NoMigrationPath { from: u32, to: u32 },

    #[error("Migration '{name}' expects database version {expected}, found {found}")]
    VersionMismatch { name: &'static str, expected: u32, found: u32 },

    #[error("Invoice {key}: {source}")]
    MalformedRecord {
        key: String,
        #[source]
        source: MalformedRecord,
    },

    #[error("Invoice {key}: invalid payment request ({networks_tried} network(s) tried): {source}")]
    PaymentRequestDecodeFailure {
        key: String,
        networks_tried: usize,
        #[source]
        source: PaymentRequestError,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to encode record: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Migration '{name}' (v{from_version} -> v{to_version}) failed: {source}")]
    StepFailed {
        name: &'static str,
        from_version: u32,
        to_version: u32,
        #[source]
        source: Box<MigrationError>,
    },

    #[error("Migration aborted")]
    Aborted,
}
