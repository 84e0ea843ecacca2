//! Transactional key-value store boundary.
//!
//! Records live in named [`Bucket`]s as opaque byte blobs. All access goes through a
//! [`StoreTransaction`]: writes become visible only once the transaction commits, and a
//! transaction that is dropped without committing (on error or while unwinding from a panic) is
//! discarded in full.

use crate::error::StorageError;
use std::fmt;

mod memory;
mod options;
mod rocksdb;

pub use self::rocksdb::{RocksDbStore, RocksDbTransaction};
pub use memory::{MemoryStore, MemoryTransaction};
pub use options::RocksDbConfig;

/// A named partition of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bucket {
    pub name: &'static str,
    pub point_lookup: bool,
}

impl Bucket {
    pub const fn new(name: &'static str) -> Self {
        Self { name, point_lookup: false }
    }

    pub const fn set_point_lookup(mut self) -> Self {
        self.point_lookup = true;
        self
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

pub const ALL_BUCKETS: &[&Bucket] = &[&crate::meta::META_BUCKET, &crate::invoices::INVOICE_BUCKET];

/// A read-write view of the store. Reads observe the transaction's own writes.
pub trait StoreTransaction {
    fn has_bucket(&self, bucket: &Bucket) -> Result<bool, StorageError>;

    fn create_bucket_if_missing(&mut self, bucket: &Bucket) -> Result<(), StorageError>;

    /// Errors with [`StorageError::BucketNotFound`] when the bucket does not exist.
    fn get(&self, bucket: &Bucket, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    fn put(&mut self, bucket: &Bucket, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    /// Visits every entry of the bucket in key order.
    fn for_each(&self, bucket: &Bucket, f: &mut dyn FnMut(&[u8], &[u8])) -> Result<(), StorageError>;

    fn commit(self) -> Result<(), StorageError>
    where
        Self: Sized;
}

pub trait Store {
    type Transaction<'a>: StoreTransaction + 'a
    where
        Self: 'a;

    fn begin(&self) -> Result<Self::Transaction<'_>, StorageError>;

    /// Runs `f` in a new transaction, committing if it returns `Ok`. On `Err` the transaction is
    /// dropped and nothing it wrote persists.
    fn with_transaction<'s, T, E, F>(&'s self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Transaction<'s>) -> Result<T, E>,
        E: From<StorageError>,
    {
        let mut tx = self.begin()?;
        let res = f(&mut tx)?;
        tx.commit()?;
        Ok(res)
    }

    /// Runs `f` against a transaction that is always discarded.
    fn view<'s, T, E, F>(&'s self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self::Transaction<'s>) -> Result<T, E>,
        E: From<StorageError>,
    {
        let tx = self.begin()?;
        f(&tx)
    }
}
