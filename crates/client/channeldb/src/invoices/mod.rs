//! Invoice records.
//!
//! Invoices live in the [`INVOICE_BUCKET`] keyed by their 4-byte big-endian sequence number. The
//! same bucket holds the last assigned sequence number under [`NUM_INVOICES_KEY`].

use crate::error::{DbError, StorageError};
use crate::store::{Bucket, StoreTransaction};
use lp_invoice::Invoice;

pub mod codec;
pub mod legacy;

pub use codec::{decode_invoice, encode_invoice};

pub const INVOICE_BUCKET: Bucket = Bucket::new("invoices");

/// Invoice counter. Not an invoice record.
pub const NUM_INVOICES_KEY: &[u8] = b"nik";

pub fn invoice_key(seq: u32) -> [u8; 4] {
    seq.to_be_bytes()
}

pub fn invoice_seq(key: &[u8]) -> Option<u32> {
    Some(u32::from_be_bytes(key.try_into().ok()?))
}

/// Human readable form of an invoice bucket key, for logs and errors.
pub fn display_key(key: &[u8]) -> String {
    match invoice_seq(key) {
        Some(seq) => format!("#{seq}"),
        None => key.iter().map(|b| format!("{b:02x}")).collect(),
    }
}

/// Every raw entry of the invoice bucket except the counter, in key order.
pub(crate) fn raw_invoice_entries<T: StoreTransaction + ?Sized>(
    tx: &T,
) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
    if !tx.has_bucket(&INVOICE_BUCKET)? {
        return Ok(vec![]);
    }
    let mut entries = vec![];
    tx.for_each(&INVOICE_BUCKET, &mut |key, value| {
        if key != NUM_INVOICES_KEY {
            entries.push((key.to_vec(), value.to_vec()));
        }
    })?;
    Ok(entries)
}

/// Stores `invoice` under a freshly assigned sequence number and returns it.
pub(crate) fn add_invoice<T: StoreTransaction + ?Sized>(tx: &mut T, invoice: &Invoice) -> Result<u32, DbError> {
    tx.create_bucket_if_missing(&INVOICE_BUCKET)?;

    let last = match tx.get(&INVOICE_BUCKET, NUM_INVOICES_KEY)? {
        Some(raw) => invoice_seq(&raw).ok_or_else(|| {
            StorageError::InconsistentStorage(format!("invoice counter is {} bytes long", raw.len()).into())
        })?,
        None => 0,
    };
    let seq = last.checked_add(1).ok_or(DbError::InvoiceCounterOverflow)?;

    let mut invoice = invoice.clone();
    invoice.add_index = seq.into();
    tx.put(&INVOICE_BUCKET, &invoice_key(seq), &encode_invoice(&invoice)?)?;
    tx.put(&INVOICE_BUCKET, NUM_INVOICES_KEY, &invoice_key(seq))?;
    Ok(seq)
}

pub(crate) fn get_invoice<T: StoreTransaction + ?Sized>(tx: &T, seq: u32) -> Result<Option<Invoice>, DbError> {
    if !tx.has_bucket(&INVOICE_BUCKET)? {
        return Ok(None);
    }
    let Some(raw) = tx.get(&INVOICE_BUCKET, &invoice_key(seq))? else { return Ok(None) };
    Ok(Some(decode_invoice(&raw)?))
}

pub(crate) fn all_invoices<T: StoreTransaction + ?Sized>(
    tx: &T,
    pending_only: bool,
) -> Result<Vec<(u32, Invoice)>, DbError> {
    let mut invoices = vec![];
    for (key, value) in raw_invoice_entries(tx)? {
        let Some(seq) = invoice_seq(&key) else {
            tracing::warn!("Skipping invoice entry with unexpected key {}", display_key(&key));
            continue;
        };
        let invoice = decode_invoice(&value)?;
        if pending_only && !invoice.is_pending() {
            continue;
        }
        invoices.push((seq, invoice));
    }
    Ok(invoices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Store};
    use assert_matches::assert_matches;
    use lp_invoice::ContractState;

    fn invoice(state: ContractState) -> Invoice {
        let mut invoice = Invoice::default();
        invoice.terms.state = state;
        invoice
    }

    #[test]
    fn test_keys() {
        assert_eq!(invoice_key(1), [0, 0, 0, 1]);
        assert_eq!(invoice_seq(&[0, 0, 1, 0]), Some(256));
        assert_eq!(invoice_seq(NUM_INVOICES_KEY), None);
        assert_eq!(display_key(&invoice_key(42)), "#42");
        assert_eq!(display_key(NUM_INVOICES_KEY), "6e696b");
    }

    #[test]
    fn test_add_assigns_sequence_numbers() {
        let store = MemoryStore::new();
        let first = store.with_transaction(|tx| add_invoice(tx, &invoice(ContractState::Open))).unwrap();
        let second = store.with_transaction(|tx| add_invoice(tx, &invoice(ContractState::Settled))).unwrap();
        assert_eq!((first, second), (1, 2));

        let stored = store.view(|tx| get_invoice(tx, 2)).unwrap().unwrap();
        assert_eq!(stored.add_index, 2);
        assert_eq!(stored.terms.state, ContractState::Settled);
        assert_eq!(store.view(|tx| get_invoice(tx, 3)).unwrap(), None);
    }

    #[test]
    fn test_all_invoices_skips_counter() {
        let store = MemoryStore::new();
        assert!(store.view(|tx| all_invoices(tx, false)).unwrap().is_empty());

        for state in [ContractState::Open, ContractState::Settled, ContractState::Accepted, ContractState::Canceled] {
            store.with_transaction(|tx| add_invoice(tx, &invoice(state))).unwrap();
        }
        let all = store.view(|tx| all_invoices(tx, false)).unwrap();
        assert_eq!(all.iter().map(|(seq, _)| *seq).collect::<Vec<_>>(), vec![1, 2, 3, 4]);

        let pending = store.view(|tx| all_invoices(tx, true)).unwrap();
        assert_eq!(pending.iter().map(|(seq, _)| *seq).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_counter_overflow() {
        let store = MemoryStore::new();
        store
            .with_transaction(|tx| -> Result<(), StorageError> {
                tx.create_bucket_if_missing(&INVOICE_BUCKET)?;
                tx.put(&INVOICE_BUCKET, NUM_INVOICES_KEY, &invoice_key(u32::MAX))
            })
            .unwrap();
        assert_matches!(
            store.with_transaction(|tx| add_invoice(tx, &Invoice::default())),
            Err(DbError::InvoiceCounterOverflow)
        );
    }
}
