//! Invoice records as written before schema version 1.
//!
//! Fixed-width big-endian integers, length-prefixed byte strings, dates as unix seconds. These
//! records carry no expiry or final CLTV delta, and keep a flat list of the HTLC attempts that
//! paid them.

use super::codec::MAX_RECORD_SIZE;
use crate::error::MalformedRecord;
use bincode::Options;
use chrono::{DateTime, TimeZone, Utc};
use lp_invoice::MilliSatoshi;
use serde::{Deserialize, Serialize};

fn bincode_opts() -> impl bincode::Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_big_endian()
        .with_limit(MAX_RECORD_SIZE)
        .reject_trailing_bytes()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegacyContractState {
    #[default]
    Open,
    Settled,
    Canceled,
    Accepted,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyContractTerm {
    pub payment_preimage: [u8; 32],
    pub value: MilliSatoshi,
    pub state: LegacyContractState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegacyHtlcState {
    Accepted,
    Settled,
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyHtlcAttempt {
    pub amount: MilliSatoshi,
    pub accept_time: i64,
    pub state: LegacyHtlcState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyInvoice {
    pub memo: Vec<u8>,
    pub receipt: Vec<u8>,
    pub payment_request: Vec<u8>,
    pub creation_date: i64,
    /// Zero while the invoice is unsettled.
    pub settle_date: i64,
    pub terms: LegacyContractTerm,
    pub add_index: u64,
    pub settle_index: u64,
    pub amt_paid: MilliSatoshi,
    pub htlcs: Vec<LegacyHtlcAttempt>,
}

impl LegacyInvoice {
    pub fn creation_date(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.creation_date, 0).single()
    }

    /// `Some(None)` for an unsettled invoice, `None` if the stored date is out of range.
    pub fn settle_date(&self) -> Option<Option<DateTime<Utc>>> {
        match self.settle_date {
            0 => Some(None),
            secs => Utc.timestamp_opt(secs, 0).single().map(Some),
        }
    }
}

pub fn encode_legacy_invoice(invoice: &LegacyInvoice) -> Result<Vec<u8>, bincode::Error> {
    bincode_opts().serialize(invoice)
}

pub fn decode_legacy_invoice(bytes: &[u8]) -> Result<LegacyInvoice, MalformedRecord> {
    bincode_opts().deserialize(bytes).map_err(|source| MalformedRecord { kind: "legacy invoice", source })
}
