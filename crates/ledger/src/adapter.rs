//! Per-rail mapping from raw ledger records to deposits.
//!
//! Every payment rail stores the same escrow shape; what differs is how the
//! depositor is identified for the self-dealing guard and which way the
//! conversion rate points. Records that do not fit the rail are rejected
//! here and never reach the synchronizer's classification step.

use serde::{Deserialize, Serialize};
use tracing::debug;
use types::{
    deposit::{Deposit, DepositWithAvailableLiquidity, RawDepositRecord},
    errors::LiquidityError,
    units::RateOrientation,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    /// The depositor's account address.
    #[default]
    Depositor,
    /// The hash of the depositor's off-chain registration.
    DepositorIdHash,
}

pub trait RailAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn identity_source(&self) -> IdentitySource;

    fn rate_orientation(&self) -> RateOrientation;

    fn to_deposit(
        &self,
        raw: RawDepositRecord,
    ) -> Result<DepositWithAvailableLiquidity, LiquidityError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardRail {
    pub name: String,
    pub identity_source: IdentitySource,
    pub rate_orientation: RateOrientation,
}

impl StandardRail {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        identity_source: IdentitySource,
        rate_orientation: RateOrientation,
    ) -> Self {
        Self {
            name: name.into(),
            identity_source,
            rate_orientation,
        }
    }
}

impl Default for StandardRail {
    fn default() -> Self {
        Self::new(
            "venmo",
            IdentitySource::Depositor,
            RateOrientation::SettlementPerFiat,
        )
    }
}

impl RailAdapter for StandardRail {
    fn name(&self) -> &str {
        &self.name
    }

    fn identity_source(&self) -> IdentitySource {
        self.identity_source
    }

    fn rate_orientation(&self) -> RateOrientation {
        self.rate_orientation
    }

    fn to_deposit(
        &self,
        raw: RawDepositRecord,
    ) -> Result<DepositWithAvailableLiquidity, LiquidityError> {
        if raw.depositor.trim().is_empty() {
            return Err(LiquidityError::MalformedRecord(format!(
                "deposit {} has no depositor",
                raw.deposit_id
            )));
        }
        if raw.conversion_rate.is_zero() {
            return Err(LiquidityError::MalformedRecord(format!(
                "deposit {} has a zero conversion rate",
                raw.deposit_id
            )));
        }

        let depositor_identity = match self.identity_source {
            IdentitySource::Depositor => raw.depositor.clone(),
            IdentitySource::DepositorIdHash => match raw.depositor_id_hash.as_deref() {
                Some(hash) if !hash.trim().is_empty() => hash.to_string(),
                _ => {
                    return Err(LiquidityError::MalformedRecord(format!(
                        "deposit {} has no depositor id hash",
                        raw.deposit_id
                    )));
                }
            },
        };

        let unreserved = raw
            .remaining_deposit_amount
            .saturating_sub(raw.outstanding_intent_amount);
        if raw.available_liquidity > unreserved {
            debug!(
                rail = %self.name,
                deposit_id = %raw.deposit_id,
                available = %raw.available_liquidity,
                remaining = %raw.remaining_deposit_amount,
                "Available liquidity exceeds remaining minus outstanding; trusting the ledger"
            );
        }

        Ok(DepositWithAvailableLiquidity {
            deposit_id: raw.deposit_id,
            available_liquidity: raw.available_liquidity,
            depositor_identity,
            deposit: Deposit {
                depositor: raw.depositor,
                payment_identifier: raw.payment_identifier,
                deposit_amount: raw.deposit_amount,
                remaining_deposit_amount: raw.remaining_deposit_amount,
                outstanding_intent_amount: raw.outstanding_intent_amount,
                conversion_rate: raw.conversion_rate,
                intent_hashes: raw.intent_hashes,
            },
        })
    }
}
