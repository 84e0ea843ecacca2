use super::options::rocksdb_global_options;
use super::{Bucket, RocksDbConfig, Store, StoreTransaction, ALL_BUCKETS};
use crate::error::StorageError;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, FlushOptions, IteratorMode, MultiThreaded, OptimisticTransactionDB,
    OptimisticTransactionOptions, Options, WriteOptions, DEFAULT_COLUMN_FAMILY_NAME,
};
use std::{fmt, path::Path, sync::Arc};

type DB = OptimisticTransactionDB<MultiThreaded>;

/// Buckets that always exist once the database has been opened.
const REQUIRED_BUCKETS: &[&Bucket] = &[&crate::meta::META_BUCKET];

/// [`Store`] backed by a rocksdb optimistic transaction database. Buckets are column families.
pub struct RocksDbStore {
    db: DB,
    writeopts: WriteOptions,
    config: RocksDbConfig,
}

impl fmt::Debug for RocksDbStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RocksDbStore").field("config", &self.config).finish()
    }
}

impl Drop for RocksDbStore {
    fn drop(&mut self) {
        let mut opts = FlushOptions::default();
        opts.set_wait(true);
        if let Err(err) = self.db.flush_opt(&opts) {
            tracing::warn!("Error when flushing the database: {err:#}");
        }
    }
}

impl RocksDbStore {
    pub fn open(path: &Path, config: &RocksDbConfig) -> Result<Self, StorageError> {
        let opts = rocksdb_global_options(config);

        // Column families that exist on disk have to be opened too, whether or not we know them.
        let existing = if path.join("CURRENT").exists() { DB::list_cf(&opts, path)? } else { vec![] };
        let mut descriptors: Vec<ColumnFamilyDescriptor> = REQUIRED_BUCKETS
            .iter()
            .map(|bucket| ColumnFamilyDescriptor::new(bucket.name, bucket.rocksdb_options(config)))
            .collect();
        for name in existing {
            if name == DEFAULT_COLUMN_FAMILY_NAME || REQUIRED_BUCKETS.iter().any(|bucket| bucket.name == name) {
                continue;
            }
            let options = match ALL_BUCKETS.iter().find(|bucket| bucket.name == name) {
                Some(bucket) => bucket.rocksdb_options(config),
                None => Options::default(),
            };
            descriptors.push(ColumnFamilyDescriptor::new(name, options));
        }

        tracing::debug!("Opening db at {:?}", path.display());
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        let mut writeopts = WriteOptions::new();
        writeopts.set_sync(config.sync_writes);

        Ok(Self { db, writeopts, config: config.clone() })
    }

    pub fn config(&self) -> &RocksDbConfig {
        &self.config
    }
}

impl Store for RocksDbStore {
    type Transaction<'a> = RocksDbTransaction<'a>;

    fn begin(&self) -> Result<RocksDbTransaction<'_>, StorageError> {
        let mut txn_opts = OptimisticTransactionOptions::new();
        // Reads inside a transaction see the database as of its start.
        txn_opts.set_snapshot(true);
        let tx = self.db.transaction_opt(&self.writeopts, &txn_opts);
        Ok(RocksDbTransaction { store: self, tx })
    }
}

pub struct RocksDbTransaction<'a> {
    store: &'a RocksDbStore,
    tx: rocksdb::Transaction<'a, DB>,
}

impl<'a> RocksDbTransaction<'a> {
    fn column(&self, bucket: &Bucket) -> Result<Arc<BoundColumnFamily<'a>>, StorageError> {
        self.store.db.cf_handle(bucket.name).ok_or(StorageError::BucketNotFound(bucket.name))
    }
}

impl StoreTransaction for RocksDbTransaction<'_> {
    fn has_bucket(&self, bucket: &Bucket) -> Result<bool, StorageError> {
        Ok(self.store.db.cf_handle(bucket.name).is_some())
    }

    /// Column family creation is not transactional: a bucket created by a transaction that is
    /// later discarded stays, empty.
    fn create_bucket_if_missing(&mut self, bucket: &Bucket) -> Result<(), StorageError> {
        if self.has_bucket(bucket)? {
            return Ok(());
        }
        tracing::debug!("Creating bucket {bucket}");
        self.store.db.create_cf(bucket.name, &bucket.rocksdb_options(&self.store.config))?;
        Ok(())
    }

    fn get(&self, bucket: &Bucket, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let col = self.column(bucket)?;
        Ok(self.tx.get_cf(&col, key)?)
    }

    fn put(&mut self, bucket: &Bucket, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let col = self.column(bucket)?;
        self.tx.put_cf(&col, key, value)?;
        Ok(())
    }

    fn for_each(&self, bucket: &Bucket, f: &mut dyn FnMut(&[u8], &[u8])) -> Result<(), StorageError> {
        let col = self.column(bucket)?;
        for entry in self.tx.iterator_cf(&col, IteratorMode::Start) {
            let (key, value) = entry?;
            f(&key, &value);
        }
        Ok(())
    }

    fn commit(self) -> Result<(), StorageError> {
        self.tx.commit()?;
        Ok(())
    }
}
