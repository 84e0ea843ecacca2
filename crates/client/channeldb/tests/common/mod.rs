#![allow(dead_code)]

use lc_channeldb::invoices::legacy::{
    encode_legacy_invoice, LegacyContractState, LegacyContractTerm, LegacyHtlcAttempt, LegacyHtlcState, LegacyInvoice,
};
use lc_channeldb::invoices::{invoice_key, INVOICE_BUCKET, NUM_INVOICES_KEY};
use lc_channeldb::store::{RocksDbStore, Store, StoreTransaction};
use lc_channeldb::{RocksDbConfig, StorageError};
use lp_invoice::{DecodedPaymentRequest, MilliSatoshi, NetworkParams, PaymentRequestError};
use rstest::*;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

#[fixture]
pub fn temp_dir() -> TempDir {
    TempDir::with_prefix("channeldb-test").unwrap()
}

/// Decodes payment requests of the form `ln<hrp>1|c=<cltv>|x=<expiry secs>|d=<description>`, every
/// field optional.
pub fn decode_test_payment_request(
    payment_request: &[u8],
    network: &NetworkParams,
) -> Result<DecodedPaymentRequest, PaymentRequestError> {
    let payment_request = std::str::from_utf8(payment_request).map_err(|_| PaymentRequestError::InvalidUtf8)?;
    let mut fields = payment_request.split('|');
    if fields.next() != Some(format!("ln{}1", network.bech32_hrp).as_str()) {
        return Err(PaymentRequestError::WrongNetwork { expected: network.bech32_hrp.to_string() });
    }

    let mut decoded = DecodedPaymentRequest::default();
    for field in fields {
        let invalid = || PaymentRequestError::Invalid(format!("bad field `{field}`").into());
        match field.split_once('=') {
            Some(("c", cltv)) => decoded.min_final_cltv_expiry = Some(cltv.parse().map_err(|_| invalid())?),
            Some(("x", secs)) => decoded.expiry = Some(Duration::from_secs(secs.parse().map_err(|_| invalid())?)),
            Some(("d", description)) => decoded.description = Some(description.into()),
            _ => return Err(invalid()),
        }
    }
    Ok(decoded)
}

pub fn legacy_invoice(payment_request: &str) -> LegacyInvoice {
    LegacyInvoice {
        memo: b"test".to_vec(),
        receipt: vec![],
        payment_request: payment_request.as_bytes().to_vec(),
        creation_date: 1_550_000_000,
        settle_date: 0,
        terms: LegacyContractTerm {
            payment_preimage: [7; 32],
            value: MilliSatoshi::from_satoshis(1_000),
            state: LegacyContractState::Open,
        },
        add_index: 0,
        settle_index: 0,
        amt_paid: MilliSatoshi(0),
        htlcs: vec![LegacyHtlcAttempt {
            amount: MilliSatoshi::from_satoshis(1_000),
            accept_time: 1_550_000_100,
            state: LegacyHtlcState::Accepted,
        }],
    }
}

/// Writes `invoices` in the legacy layout under sequence numbers 1..=n, along with the invoice
/// counter.
pub fn seed_legacy_invoices<S: Store>(store: &S, invoices: &[LegacyInvoice]) {
    let raw: Vec<_> = invoices.iter().map(|invoice| encode_legacy_invoice(invoice).unwrap()).collect();
    seed_raw_invoices(store, &raw);
}

pub fn seed_raw_invoices<S: Store>(store: &S, records: &[Vec<u8>]) {
    store
        .with_transaction(|tx| -> Result<(), StorageError> {
            tx.create_bucket_if_missing(&INVOICE_BUCKET)?;
            for (i, record) in records.iter().enumerate() {
                let seq = u32::try_from(i + 1).unwrap();
                tx.put(&INVOICE_BUCKET, &invoice_key(seq), record)?;
            }
            if !records.is_empty() {
                tx.put(&INVOICE_BUCKET, NUM_INVOICES_KEY, &invoice_key(records.len() as u32))?;
            }
            Ok(())
        })
        .unwrap();
}

/// Opens the rocksdb store at `path`, runs `f` against it and closes it again.
pub fn with_rocksdb<T>(path: &Path, f: impl FnOnce(&RocksDbStore) -> T) -> T {
    let store = RocksDbStore::open(path, &RocksDbConfig::default()).unwrap();
    f(&store)
}

/// Every entry of the invoice bucket, counter included, in key order.
pub fn raw_invoice_bucket<S: Store>(store: &S) -> Vec<(Vec<u8>, Vec<u8>)> {
    store
        .view(|tx| -> Result<_, StorageError> {
            let mut entries = vec![];
            if tx.has_bucket(&INVOICE_BUCKET)? {
                tx.for_each(&INVOICE_BUCKET, &mut |key, value| entries.push((key.to_vec(), value.to_vec())))?;
            }
            Ok(entries)
        })
        .unwrap()
}
