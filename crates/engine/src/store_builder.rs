//! Ranking of live deposits into the store the matcher scans.
//!
//! The store is built once per published cycle and never mutated. Ranking
//! is total (the deposit id breaks every remaining tie) so the same live set
//! always produces the same store.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use types::{
    deposit::{DepositId, DepositWithAvailableLiquidity, StoredDeposit},
    units::RateOrientation,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingPolicy {
    /// Cheapest fiat cost for the requester first, deeper liquidity on ties.
    #[default]
    BestPrice,
    /// Deepest liquidity first, cheapest fiat cost on ties.
    DeepestLiquidity,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepositStore {
    deposits: Vec<StoredDeposit>,
}

impl DepositStore {
    #[must_use]
    pub fn len(&self) -> usize {
        self.deposits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deposits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StoredDeposit> {
        self.deposits.iter()
    }

    #[must_use]
    pub fn get(&self, deposit_id: &DepositId) -> Option<&StoredDeposit> {
        self.deposits.iter().find(|d| &d.deposit_id == deposit_id)
    }

    #[must_use]
    pub fn deposit_ids(&self) -> Vec<DepositId> {
        self.deposits.iter().map(|d| d.deposit_id).collect()
    }
}

/// `Less` when `a` costs the requester less fiat per settlement unit.
fn compare_price(
    a: &DepositWithAvailableLiquidity,
    b: &DepositWithAvailableLiquidity,
    orientation: RateOrientation,
) -> Ordering {
    match orientation {
        // More settlement per fiat unit is cheaper.
        RateOrientation::SettlementPerFiat => b.conversion_rate().cmp(&a.conversion_rate()),
        RateOrientation::FiatPerSettlement => a.conversion_rate().cmp(&b.conversion_rate()),
    }
}

fn compare_liquidity(a: &DepositWithAvailableLiquidity, b: &DepositWithAvailableLiquidity) -> Ordering {
    b.available_liquidity.cmp(&a.available_liquidity)
}

#[must_use]
pub fn build_store(
    mut live: Vec<DepositWithAvailableLiquidity>,
    policy: RankingPolicy,
    orientation: RateOrientation,
) -> DepositStore {
    live.sort_by(|a, b| {
        let ranked = match policy {
            RankingPolicy::BestPrice => {
                compare_price(a, b, orientation).then_with(|| compare_liquidity(a, b))
            }
            RankingPolicy::DeepestLiquidity => {
                compare_liquidity(a, b).then_with(|| compare_price(a, b, orientation))
            }
        };
        ranked.then_with(|| a.deposit_id.cmp(&b.deposit_id))
    });

    DepositStore {
        deposits: live
            .into_iter()
            .enumerate()
            .map(|(rank, deposit)| StoredDeposit::new(rank, deposit))
            .collect(),
    }
}
