use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Amount in thousandths of a satoshi.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MilliSatoshi(pub u64);

impl MilliSatoshi {
    pub const fn from_satoshis(sat: u64) -> Self {
        Self(sat * 1000)
    }

    /// Rounds down to whole satoshis.
    pub const fn to_satoshis(self) -> u64 {
        self.0 / 1000
    }
}

impl fmt::Display for MilliSatoshi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mSAT", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractState {
    /// Waiting for a payment.
    #[default]
    Open,
    /// Paid and the preimage released.
    Settled,
    Canceled,
    /// An HTLC was accepted but the invoice is not settled yet (hold invoices).
    Accepted,
}

impl ContractState {
    /// Open and accepted invoices can still transition, the others are final.
    pub fn is_pending(&self) -> bool {
        matches!(self, ContractState::Open | ContractState::Accepted)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractTerm {
    pub payment_preimage: [u8; 32],
    pub value: MilliSatoshi,
    pub state: ContractState,
}

/// Identifies an incoming HTLC on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CircuitKey {
    pub chan_id: u64,
    pub htlc_id: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HtlcState {
    #[default]
    Accepted,
    Canceled,
    Settled,
}

/// Settlement state of one HTLC paying to an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceHtlc {
    pub amount: MilliSatoshi,
    pub accept_height: u32,
    pub accept_time: DateTime<Utc>,
    pub resolve_time: Option<DateTime<Utc>>,
    /// Absolute block height at which the HTLC expires.
    pub expiry: u32,
    pub state: HtlcState,
}

/// An invoice as persisted by the channel database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Free-form description shown to the payer.
    pub memo: Vec<u8>,
    pub receipt: Vec<u8>,
    /// Encoded payment request this invoice was created from. Empty for invoices created without one.
    pub payment_request: Vec<u8>,
    /// Minimum CLTV delta the final hop requires, as advertised in the payment request.
    pub final_cltv_delta: i32,
    /// How long after `creation_date` the invoice stays payable.
    pub expiry: Duration,
    pub creation_date: DateTime<Utc>,
    pub settle_date: Option<DateTime<Utc>>,
    pub terms: ContractTerm,
    pub add_index: u64,
    pub settle_index: u64,
    pub amt_paid: MilliSatoshi,
    pub htlcs: BTreeMap<CircuitKey, InvoiceHtlc>,
}

impl Invoice {
    pub fn is_pending(&self) -> bool {
        self.terms.state.is_pending()
    }

    /// Instant after which the invoice can no longer be paid.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let expiry = chrono::Duration::from_std(self.expiry).ok()?;
        self.creation_date.checked_add_signed(expiry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::*;

    #[fixture]
    fn invoice() -> Invoice {
        Invoice {
            memo: b"coffee".to_vec(),
            receipt: vec![],
            payment_request: b"lnbc1".to_vec(),
            final_cltv_delta: 40,
            expiry: Duration::from_secs(3600),
            creation_date: Utc.timestamp_opt(1_000, 0).unwrap(),
            settle_date: None,
            terms: ContractTerm::default(),
            add_index: 1,
            settle_index: 0,
            amt_paid: MilliSatoshi(0),
            htlcs: BTreeMap::new(),
        }
    }

    #[rstest]
    #[case(ContractState::Open, true)]
    #[case(ContractState::Accepted, true)]
    #[case(ContractState::Settled, false)]
    #[case(ContractState::Canceled, false)]
    fn test_pending_states(mut invoice: Invoice, #[case] state: ContractState, #[case] pending: bool) {
        invoice.terms.state = state;
        assert_eq!(invoice.is_pending(), pending);
    }

    #[rstest]
    fn test_expires_at(invoice: Invoice) {
        assert_eq!(invoice.expires_at(), Some(Utc.timestamp_opt(4_600, 0).unwrap()));
    }

    #[test]
    fn test_msat_conversions() {
        assert_eq!(MilliSatoshi::from_satoshis(21), MilliSatoshi(21_000));
        assert_eq!(MilliSatoshi(21_999).to_satoshis(), 21);
        assert_eq!(MilliSatoshi(5).to_string(), "5 mSAT");
    }

    #[rstest]
    fn test_htlcs_ordered_by_circuit_key(mut invoice: Invoice) {
        let htlc = InvoiceHtlc {
            amount: MilliSatoshi(1),
            accept_height: 100,
            accept_time: Utc.timestamp_opt(10, 0).unwrap(),
            resolve_time: None,
            expiry: 140,
            state: HtlcState::Accepted,
        };
        invoice.htlcs.insert(CircuitKey { chan_id: 2, htlc_id: 0 }, htlc.clone());
        invoice.htlcs.insert(CircuitKey { chan_id: 1, htlc_id: 7 }, htlc);

        let keys: Vec<_> = invoice.htlcs.keys().map(|k| (k.chan_id, k.htlc_id)).collect();
        assert_eq!(keys, vec![(1, 7), (2, 0)]);
    }
}
