//! Boundary to the payment request (BOLT11) codec.
//!
//! The channel database never parses payment requests itself: whoever opens it hands in a
//! [`PaymentRequestDecoder`]. Defaults for fields a payment request may omit live here so every
//! decoder applies the same ones.

use crate::MilliSatoshi;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

/// Expiry used when a payment request has no `x` field.
pub const DEFAULT_INVOICE_EXPIRY: Duration = Duration::from_secs(3600);

/// Minimum final CLTV expiry used when a payment request has no `c` field.
pub const DEFAULT_MIN_FINAL_CLTV_EXPIRY: u64 = 9;

/// Chain parameters a payment request is decoded against. Only the bech32 human readable part
/// matters to the decoder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkParams {
    pub name: Cow<'static, str>,
    pub bech32_hrp: Cow<'static, str>,
}

impl NetworkParams {
    pub const fn new(name: &'static str, bech32_hrp: &'static str) -> Self {
        Self { name: Cow::Borrowed(name), bech32_hrp: Cow::Borrowed(bech32_hrp) }
    }

    pub const BITCOIN_MAINNET: Self = Self::new("bitcoin-mainnet", "bc");
    pub const BITCOIN_TESTNET: Self = Self::new("bitcoin-testnet", "tb");
    pub const BITCOIN_REGTEST: Self = Self::new("bitcoin-regtest", "bcrt");
    pub const BITCOIN_SIMNET: Self = Self::new("bitcoin-simnet", "sb");
    pub const LITECOIN_MAINNET: Self = Self::new("litecoin-mainnet", "ltc");
    pub const LITECOIN_TESTNET: Self = Self::new("litecoin-testnet", "tltc");
    pub const LITECOIN_REGTEST: Self = Self::new("litecoin-regtest", "rltc");
    pub const LITECOIN_SIMNET: Self = Self::new("litecoin-simnet", "sltc");

    /// Every network a node could have created invoices on, bitcoin first.
    pub fn all_known() -> Vec<Self> {
        vec![
            Self::BITCOIN_MAINNET,
            Self::BITCOIN_SIMNET,
            Self::BITCOIN_REGTEST,
            Self::BITCOIN_TESTNET,
            Self::LITECOIN_MAINNET,
            Self::LITECOIN_SIMNET,
            Self::LITECOIN_REGTEST,
            Self::LITECOIN_TESTNET,
        ]
    }
}

impl fmt::Display for NetworkParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (hrp={})", self.name, self.bech32_hrp)
    }
}

/// Fields of a decoded payment request. Optional fields are `None` when the request does not
/// carry them; use the accessors to get the effective value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedPaymentRequest {
    pub payment_hash: [u8; 32],
    pub timestamp: Option<DateTime<Utc>>,
    pub amount: Option<MilliSatoshi>,
    pub description: Option<String>,
    pub expiry: Option<Duration>,
    pub min_final_cltv_expiry: Option<u64>,
}

impl DecodedPaymentRequest {
    pub fn expiry(&self) -> Duration {
        self.expiry.unwrap_or(DEFAULT_INVOICE_EXPIRY)
    }

    pub fn min_final_cltv_expiry(&self) -> u64 {
        self.min_final_cltv_expiry.unwrap_or(DEFAULT_MIN_FINAL_CLTV_EXPIRY)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PaymentRequestError {
    #[error("Payment request is not valid UTF-8")]
    InvalidUtf8,
    #[error("Payment request belongs to another network (expected hrp `{expected}`)")]
    WrongNetwork { expected: String },
    #[error("Invalid payment request: {0}")]
    Invalid(Cow<'static, str>),
}

/// Decodes encoded payment requests. Implemented by the BOLT11 codec of the node, and by any
/// `Fn(&[u8], &NetworkParams) -> Result<DecodedPaymentRequest, PaymentRequestError>`.
pub trait PaymentRequestDecoder {
    fn decode(
        &self,
        payment_request: &[u8],
        network: &NetworkParams,
    ) -> Result<DecodedPaymentRequest, PaymentRequestError>;
}

impl<F> PaymentRequestDecoder for F
where
    F: Fn(&[u8], &NetworkParams) -> Result<DecodedPaymentRequest, PaymentRequestError>,
{
    fn decode(
        &self,
        payment_request: &[u8],
        network: &NetworkParams,
    ) -> Result<DecodedPaymentRequest, PaymentRequestError> {
        self(payment_request, network)
    }
}
