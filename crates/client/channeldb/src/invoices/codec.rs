//! On-disk encoding of [`Invoice`] records.
//!
//! bincode with varint integers. Trailing bytes are rejected so a record written in another
//! layout does not decode by accident.

use crate::error::MalformedRecord;
use bincode::Options;
use lp_invoice::Invoice;

/// Upper bound on the size of one encoded invoice.
pub(crate) const MAX_RECORD_SIZE: u64 = 1024 * 1024;

fn bincode_opts() -> impl bincode::Options {
    bincode::DefaultOptions::new().with_limit(MAX_RECORD_SIZE).reject_trailing_bytes()
}

pub fn encode_invoice(invoice: &Invoice) -> Result<Vec<u8>, bincode::Error> {
    bincode_opts().serialize(invoice)
}

pub fn decode_invoice(bytes: &[u8]) -> Result<Invoice, MalformedRecord> {
    bincode_opts().deserialize(bytes).map_err(|source| MalformedRecord { kind: "invoice", source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use lp_invoice::{CircuitKey, ContractState, ContractTerm, HtlcState, InvoiceHtlc, MilliSatoshi};
    use rstest::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    #[fixture]
    fn invoice() -> Invoice {
        let mut htlcs = BTreeMap::new();
        htlcs.insert(
            CircuitKey { chan_id: 7, htlc_id: 1 },
            InvoiceHtlc {
                amount: MilliSatoshi(5_000),
                accept_height: 600_000,
                accept_time: Utc.timestamp_opt(1_500, 0).unwrap(),
                resolve_time: Some(Utc.timestamp_opt(1_600, 0).unwrap()),
                expiry: 600_040,
                state: HtlcState::Settled,
            },
        );
        Invoice {
            memo: b"pizza".to_vec(),
            receipt: b"receipt".to_vec(),
            payment_request: b"lnbc1pizza".to_vec(),
            final_cltv_delta: 144,
            expiry: Duration::from_secs(86_400),
            creation_date: Utc.timestamp_opt(1_000, 0).unwrap(),
            settle_date: Some(Utc.timestamp_opt(1_600, 0).unwrap()),
            terms: ContractTerm { payment_preimage: [3; 32], value: MilliSatoshi(5_000), state: ContractState::Settled },
            add_index: 4,
            settle_index: 2,
            amt_paid: MilliSatoshi(5_000),
            htlcs,
        }
    }

    #[rstest]
    fn test_encode_decode(invoice: Invoice) {
        let bytes = encode_invoice(&invoice).unwrap();
        assert_eq!(decode_invoice(&bytes).unwrap(), invoice);
    }

    #[rstest]
    fn test_truncated_record(invoice: Invoice) {
        let bytes = encode_invoice(&invoice).unwrap();
        let err = decode_invoice(&bytes[..bytes.len() - 3]).unwrap_err();
        assert_eq!(err.kind, "invoice");
    }

    #[rstest]
    fn test_trailing_bytes_rejected(invoice: Invoice) {
        let mut bytes = encode_invoice(&invoice).unwrap();
        bytes.push(0);
        assert!(decode_invoice(&bytes).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(decode_invoice(&[]).is_err());
        assert!(decode_invoice(&[0xff; 16]).is_err());
    }
}
