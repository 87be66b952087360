use alloy_primitives::U256;
use derive_more::Display;
use serde::{Serialize, Serializer};

use crate::{deposit::DepositId, errors::LiquidityError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    #[serde(with = "crate::decimal")]
    pub deposit_id: DepositId,
    /// Settlement units the quote covers.
    #[serde(with = "crate::decimal")]
    pub settlement_amount: U256,
    /// `settlement_amount` in whole tokens, e.g. `"2.0"`.
    pub settlement_amount_display: String,
    /// Fiat units (six decimals), already rounded up to a whole penny.
    #[serde(with = "crate::decimal")]
    pub fiat_amount_to_send: U256,
    pub fiat_amount_display: String,
    #[serde(with = "crate::decimal")]
    pub conversion_rate: U256,
}

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum QuoteError {
    #[display("ErrorInvalidAmount")]
    InvalidAmount,

    #[display("ErrorOverflow")]
    Overflow,

    #[display("No deposits available")]
    StoreEmpty,

    #[display("No deposits available to fulfill requested amount")]
    NoLiquidity,
}

impl Serialize for QuoteError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<LiquidityError> for QuoteError {
    fn from(e: LiquidityError) -> Self {
        match e {
            LiquidityError::Overflow => Self::Overflow,
            _ => Self::InvalidAmount,
        }
    }
}

/// Either a priced deposit or the reason none could be offered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum IndicativeQuote {
    Quote(Quote),
    Error { error: QuoteError },
}

impl IndicativeQuote {
    #[must_use]
    pub const fn error(error: QuoteError) -> Self {
        Self::Error { error }
    }

    #[must_use]
    pub const fn as_quote(&self) -> Option<&Quote> {
        match self {
            Self::Quote(quote) => Some(quote),
            Self::Error { .. } => None,
        }
    }

    #[must_use]
    pub const fn as_error(&self) -> Option<&QuoteError> {
        match self {
            Self::Quote(_) => None,
            Self::Error { error } => Some(error),
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}
