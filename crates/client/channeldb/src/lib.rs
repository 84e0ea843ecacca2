//! Channel database
//!
//! Invoice storage for a payment channel node, and the schema migrations that keep the on-disk
//! records in step with the binary.
//!
//! # Opening the database
//!
//! [`ChannelDb::open`] opens the rocksdb store and brings it to the latest schema version before
//! returning. Migrations need to decode the payment request embedded in each invoice, so the
//! caller hands in a [`PaymentRequestDecoder`] for the chains it runs on; the database layer never
//! parses payment requests itself.
//!
//! A database written by a newer binary is refused with
//! [`MigrationError::DatabaseNewerThanBinary`](migration::MigrationError::DatabaseNewerThanBinary)
//! rather than opened.
//!
//! # Storage
//!
//! Everything goes through the [`store::Store`] boundary: named buckets of opaque byte records,
//! accessed in transactions. [`store::RocksDbStore`] is the persistent implementation,
//! [`store::MemoryStore`] an in-memory one for tests. See [`migration`] for how schema versions
//! are tracked and upgraded.

use lp_invoice::{Invoice, PaymentRequestDecoder};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod error;
pub mod invoices;
pub mod meta;
pub mod migration;
pub mod store;

pub use error::{DbError, MalformedRecord, StorageError};
pub use meta::Meta;
pub use migration::{MigrationConfig, MigrationReport, MigrationRunner, MigrationStatus};
pub use store::{RocksDbConfig, RocksDbStore};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelDbConfig {
    pub rocksdb: RocksDbConfig,
    pub migration: MigrationConfig,
}

pub struct ChannelDb<S = RocksDbStore> {
    store: S,
    /// Keep the TempDir instance around so that the directory is not deleted until the ChannelDb struct is dropped.
    #[cfg(any(test, feature = "testing"))]
    _temp_dir: Option<tempfile::TempDir>,
}

impl ChannelDb<RocksDbStore> {
    /// Open the db, applying any pending migration.
    ///
    /// With [`MigrationConfig::dry_run`] set, pending migrations are only rehearsed and the
    /// returned database is left at its previous version.
    #[tracing::instrument(skip(config, payment_requests), fields(module = "ChannelDb"))]
    pub fn open(
        path: &Path,
        config: &ChannelDbConfig,
        payment_requests: &dyn PaymentRequestDecoder,
    ) -> Result<Self, DbError> {
        let store = RocksDbStore::open(path, &config.rocksdb)?;
        let db = Self::new(store);
        db.migrate(payment_requests, config.migration.clone())?;
        tracing::debug!("💾 Channel database opened at {}", path.display());
        Ok(db)
    }

    #[cfg(any(test, feature = "testing"))]
    pub fn open_for_testing(payment_requests: &dyn PaymentRequestDecoder) -> Result<Self, DbError> {
        let temp_dir = tempfile::TempDir::with_prefix("channeldb-test")?;
        let mut db = Self::open(temp_dir.path(), &ChannelDbConfig::default(), payment_requests)?;
        db._temp_dir = Some(temp_dir);
        Ok(db)
    }
}

impl<S: store::Store> ChannelDb<S> {
    /// Wraps an already open store. No migration is run.
    pub fn new(store: S) -> Self {
        Self {
            store,
            #[cfg(any(test, feature = "testing"))]
            _temp_dir: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Brings the store to the latest schema version.
    pub fn migrate(
        &self,
        payment_requests: &dyn PaymentRequestDecoder,
        config: MigrationConfig,
    ) -> Result<MigrationReport, DbError> {
        Ok(MigrationRunner::new(payment_requests, config).run_migrations(&self.store)?)
    }

    #[tracing::instrument(skip(self), fields(module = "ChannelDb"))]
    pub fn fetch_meta(&self) -> Result<Meta, DbError> {
        Ok(self.store.view(|tx| meta::get_meta(tx))?)
    }

    /// Stores a new invoice and returns the sequence number it was assigned, which also becomes
    /// its `add_index`.
    #[tracing::instrument(skip(self, invoice), fields(module = "ChannelDb"))]
    pub fn add_invoice(&self, invoice: &Invoice) -> Result<u32, DbError> {
        self.store.with_transaction(|tx| invoices::add_invoice(tx, invoice))
    }

    #[tracing::instrument(skip(self), fields(module = "ChannelDb"))]
    pub fn lookup_invoice(&self, seq: u32) -> Result<Option<Invoice>, DbError> {
        self.store.view(|tx| invoices::get_invoice(tx, seq))
    }

    /// All invoices in sequence order. With `pending_only`, only those still open or accepted.
    #[tracing::instrument(skip(self), fields(module = "ChannelDb"))]
    pub fn fetch_all_invoices(&self, pending_only: bool) -> Result<Vec<Invoice>, DbError> {
        let invoices = self.store.view(|tx| invoices::all_invoices(tx, pending_only))?;
        Ok(invoices.into_iter().map(|(_, invoice)| invoice).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use lp_invoice::{ContractState, DecodedPaymentRequest, NetworkParams, PaymentRequestError};

    fn decoder(_: &[u8], _: &NetworkParams) -> Result<DecodedPaymentRequest, PaymentRequestError> {
        Ok(DecodedPaymentRequest::default())
    }

    #[test]
    fn test_open_for_testing_is_migrated() {
        let db = ChannelDb::open_for_testing(&decoder).unwrap();
        assert_eq!(db.fetch_meta().unwrap(), Meta { db_version_number: 1 });
        assert!(db.fetch_all_invoices(false).unwrap().is_empty());
    }

    #[test]
    fn test_invoices_roundtrip_through_facade() {
        let db = ChannelDb::new(MemoryStore::new());
        db.migrate(&decoder, MigrationConfig::default()).unwrap();

        let mut invoice = Invoice { memo: b"coffee".to_vec(), ..Default::default() };
        assert_eq!(db.add_invoice(&invoice).unwrap(), 1);
        invoice.terms.state = ContractState::Settled;
        assert_eq!(db.add_invoice(&invoice).unwrap(), 2);

        let first = db.lookup_invoice(1).unwrap().unwrap();
        assert_eq!((first.memo.as_slice(), first.add_index), (&b"coffee"[..], 1));
        assert_eq!(db.lookup_invoice(3).unwrap(), None);

        assert_eq!(db.fetch_all_invoices(false).unwrap().len(), 2);
        let pending = db.fetch_all_invoices(true).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].add_index, 1);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: ChannelDbConfig = serde_json::from_str(r#"{"migration": {"dry_run": true}}"#).unwrap();
        assert!(config.migration.dry_run);
        assert_eq!(config.migration.networks, NetworkParams::all_known());
        assert!(config.rocksdb.sync_writes);
    }
}
