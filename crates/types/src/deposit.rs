use std::{collections::BTreeSet, ops::Deref};

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

pub type DepositId = U256;
pub type DepositIdSet = BTreeSet<DepositId>;

/// A deposit exactly as the ledger reports it, before any rail-specific
/// validation. Amounts are settlement-asset base units, the rate carries
/// 18 decimals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDepositRecord {
    #[serde(with = "crate::decimal")]
    pub deposit_id: DepositId,
    pub depositor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depositor_id_hash: Option<String>,
    #[serde(default)]
    pub payment_identifier: String,
    #[serde(with = "crate::decimal")]
    pub deposit_amount: U256,
    #[serde(with = "crate::decimal")]
    pub remaining_deposit_amount: U256,
    #[serde(with = "crate::decimal")]
    pub outstanding_intent_amount: U256,
    #[serde(with = "crate::decimal")]
    pub conversion_rate: U256,
    #[serde(default)]
    pub intent_hashes: Vec<String>,
    #[serde(with = "crate::decimal")]
    pub available_liquidity: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deposit {
    pub depositor: String,
    pub payment_identifier: String,
    #[serde(with = "crate::decimal")]
    pub deposit_amount: U256,
    #[serde(with = "crate::decimal")]
    pub remaining_deposit_amount: U256,
    #[serde(with = "crate::decimal")]
    pub outstanding_intent_amount: U256,
    #[serde(with = "crate::decimal")]
    pub conversion_rate: U256,
    pub intent_hashes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositWithAvailableLiquidity {
    #[serde(with = "crate::decimal")]
    pub deposit_id: DepositId,
    pub deposit: Deposit,
    #[serde(with = "crate::decimal")]
    pub available_liquidity: U256,
    /// Identity used by the self-dealing guard; the depositor address or its
    /// registration hash depending on the rail.
    pub depositor_identity: String,
}

impl DepositWithAvailableLiquidity {
    /// Filled: nothing left to take and nothing in flight that could be
    /// released back.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.available_liquidity < U256::from(1) && self.deposit.outstanding_intent_amount.is_zero()
    }

    #[must_use]
    pub const fn conversion_rate(&self) -> U256 {
        self.deposit.conversion_rate
    }

    #[must_use]
    pub fn is_owned_by(&self, identity: &str) -> bool {
        !identity.is_empty() && self.depositor_identity == identity
    }
}

/// A live deposit after ranking. Read-only for the lifetime of the store it
/// belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDeposit {
    pub rank: usize,
    #[serde(flatten)]
    inner: DepositWithAvailableLiquidity,
}

impl StoredDeposit {
    #[must_use]
    pub const fn new(rank: usize, inner: DepositWithAvailableLiquidity) -> Self {
        Self { rank, inner }
    }
}

impl Deref for StoredDeposit {
    type Target = DepositWithAvailableLiquidity;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
