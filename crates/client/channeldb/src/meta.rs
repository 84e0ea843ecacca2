//! Schema version bookkeeping.
//!
//! The version is only ever read and written through a transaction, so it cannot drift from the
//! records it describes.

use crate::error::StorageError;
use crate::store::{Bucket, StoreTransaction};

pub const META_BUCKET: Bucket = Bucket::new("metadata").set_point_lookup();

const META_DB_VERSION_KEY: &[u8] = b"dbp";

/// Metadata describing the state of the database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Meta {
    /// Number of migrations applied to the database.
    pub db_version_number: u32,
}

/// Stored schema version, 0 when none was ever written.
pub fn get_version<T: StoreTransaction + ?Sized>(tx: &T) -> Result<u32, StorageError> {
    if !tx.has_bucket(&META_BUCKET)? {
        return Ok(0);
    }
    let Some(data) = tx.get(&META_BUCKET, META_DB_VERSION_KEY)? else {
        return Ok(0);
    };
    let bytes: [u8; 4] = data[..]
        .try_into()
        .map_err(|_| StorageError::InconsistentStorage(format!("db version is {} bytes long", data.len()).into()))?;
    Ok(u32::from_be_bytes(bytes))
}

pub fn set_version<T: StoreTransaction + ?Sized>(tx: &mut T, version: u32) -> Result<(), StorageError> {
    tx.create_bucket_if_missing(&META_BUCKET)?;
    tx.put(&META_BUCKET, META_DB_VERSION_KEY, &version.to_be_bytes())
}

pub fn get_meta<T: StoreTransaction + ?Sized>(tx: &T) -> Result<Meta, StorageError> {
    Ok(Meta { db_version_number: get_version(tx)? })
}
