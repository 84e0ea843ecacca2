use super::{Bucket, Store, StoreTransaction};
use crate::error::StorageError;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

type Buckets = BTreeMap<&'static str, BTreeMap<Vec<u8>, Vec<u8>>>;

/// Ephemeral [`Store`] keeping every bucket in memory.
///
/// Transactions are serialized: one holds the store lock from `begin` until it is committed or
/// dropped, and works on a private copy of the data that replaces the shared state on commit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: Mutex<Buckets>,
    fail_next_commit: AtomicBool,
    commits: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next commit fail with [`StorageError::CommitFailed`], discarding its writes.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Number of transactions committed so far.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

impl Store for MemoryStore {
    type Transaction<'a> = MemoryTransaction<'a>;

    fn begin(&self) -> Result<MemoryTransaction<'_>, StorageError> {
        // Shared state is only replaced wholesale on commit, so a transaction that panicked left it intact.
        let guard = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        let working = guard.clone();
        Ok(MemoryTransaction { store: self, guard, working })
    }
}

pub struct MemoryTransaction<'a> {
    store: &'a MemoryStore,
    guard: MutexGuard<'a, Buckets>,
    working: Buckets,
}

impl StoreTransaction for MemoryTransaction<'_> {
    fn has_bucket(&self, bucket: &Bucket) -> Result<bool, StorageError> {
        Ok(self.working.contains_key(bucket.name))
    }

    fn create_bucket_if_missing(&mut self, bucket: &Bucket) -> Result<(), StorageError> {
        self.working.entry(bucket.name).or_default();
        Ok(())
    }

    fn get(&self, bucket: &Bucket, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let entries = self.working.get(bucket.name).ok_or(StorageError::BucketNotFound(bucket.name))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&mut self, bucket: &Bucket, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let entries = self.working.get_mut(bucket.name).ok_or(StorageError::BucketNotFound(bucket.name))?;
        entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn for_each(&self, bucket: &Bucket, f: &mut dyn FnMut(&[u8], &[u8])) -> Result<(), StorageError> {
        let entries = self.working.get(bucket.name).ok_or(StorageError::BucketNotFound(bucket.name))?;
        for (key, value) in entries {
            f(key.as_slice(), value.as_slice());
        }
        Ok(())
    }

    fn commit(self) -> Result<(), StorageError> {
        let Self { store, mut guard, working } = self;
        if store.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StorageError::CommitFailed("injected commit failure".into()));
        }
        *guard = working;
        store.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
