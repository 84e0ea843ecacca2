//! Migration from v0 to v1: invoice expiry and final CLTV delta
//!
//! Updates:
//! - Invoice: adds `final_cltv_delta` and `expiry`, both taken from the invoice's own payment request
//! - Invoice: HTLC attempts are replaced by a per-circuit `htlcs` map, left empty
//! - Invoice: switches from the fixed-width legacy layout to the current codec

use crate::error::MalformedRecord;
use crate::invoices::legacy::{decode_legacy_invoice, LegacyContractState, LegacyInvoice};
use crate::invoices::{display_key, encode_invoice, raw_invoice_entries, INVOICE_BUCKET};
use crate::migration::{MigrationContext, MigrationError, MigrationProgress};
use lp_invoice::{ContractState, ContractTerm, DecodedPaymentRequest, Invoice, PaymentRequestError};
use std::collections::BTreeMap;

/// Number of invoices between two progress reports.
pub const PROGRESS_INTERVAL: usize = 1000;

pub fn migrate(ctx: &mut MigrationContext<'_>) -> Result<(), MigrationError> {
    if !ctx.tx().has_bucket(&INVOICE_BUCKET)? {
        tracing::debug!("No invoice bucket, nothing to migrate");
        return Ok(());
    }

    let entries = raw_invoice_entries(ctx.tx())?;
    let total = entries.len();
    tracing::info!("Migrating {total} invoice(s) to the new format");

    for (i, (key, value)) in entries.into_iter().enumerate() {
        if ctx.should_abort() {
            tracing::warn!("Invoice migration aborted at invoice {}", display_key(&key));
            return Err(MigrationError::Aborted);
        }

        let legacy = decode_legacy_invoice(&value)
            .map_err(|source| MigrationError::MalformedRecord { key: display_key(&key), source })?;
        let decoded = decode_payment_request(ctx, &key, &legacy.payment_request)?;
        let invoice = convert_invoice(&key, legacy, &decoded)?;

        ctx.tx_mut().put(&INVOICE_BUCKET, &key, &encode_invoice(&invoice)?)?;

        let done = i + 1;
        if done % PROGRESS_INTERVAL == 0 || done == total {
            ctx.report_progress(MigrationProgress::new(done, total, "invoices migrated"));
        }
    }

    tracing::info!("Invoice migration completed: {total} invoice(s) migrated");
    Ok(())
}

/// Tries every configured network and keeps the first successful decoding.
fn decode_payment_request(
    ctx: &MigrationContext<'_>,
    key: &[u8],
    payment_request: &[u8],
) -> Result<DecodedPaymentRequest, MigrationError> {
    let mut last_err = PaymentRequestError::Invalid("no network configured".into());
    for network in ctx.networks() {
        match ctx.payment_requests().decode(payment_request, network) {
            Ok(decoded) => {
                tracing::trace!("Invoice {} decoded on {network}", display_key(key));
                return Ok(decoded);
            }
            Err(err) => last_err = err,
        }
    }
    Err(MigrationError::PaymentRequestDecodeFailure {
        key: display_key(key),
        networks_tried: ctx.networks().len(),
        source: last_err,
    })
}

fn convert_invoice(key: &[u8], legacy: LegacyInvoice, decoded: &DecodedPaymentRequest) -> Result<Invoice, MigrationError> {
    let final_cltv_delta = i32::try_from(decoded.min_final_cltv_expiry()).map_err(|_| {
        MigrationError::PaymentRequestDecodeFailure {
            key: display_key(key),
            networks_tried: 1,
            source: PaymentRequestError::Invalid(
                format!("min final cltv expiry {} out of range", decoded.min_final_cltv_expiry()).into(),
            ),
        }
    })?;

    let malformed_date = |field: &str| MigrationError::MalformedRecord {
        key: display_key(key),
        source: MalformedRecord {
            kind: "legacy invoice",
            source: Box::new(bincode::ErrorKind::Custom(format!("{field} out of range"))),
        },
    };
    let creation_date = legacy.creation_date().ok_or_else(|| malformed_date("creation date"))?;
    let settle_date = legacy.settle_date().ok_or_else(|| malformed_date("settle date"))?;

    Ok(Invoice {
        memo: legacy.memo,
        receipt: legacy.receipt,
        payment_request: legacy.payment_request,
        final_cltv_delta,
        expiry: decoded.expiry(),
        creation_date,
        settle_date,
        terms: ContractTerm {
            payment_preimage: legacy.terms.payment_preimage,
            value: legacy.terms.value,
            state: match legacy.terms.state {
                LegacyContractState::Open => ContractState::Open,
                LegacyContractState::Settled => ContractState::Settled,
                LegacyContractState::Canceled => ContractState::Canceled,
                LegacyContractState::Accepted => ContractState::Accepted,
            },
        },
        add_index: legacy.add_index,
        settle_index: legacy.settle_index,
        amt_paid: legacy.amt_paid,
        htlcs: BTreeMap::new(),
    })
}
