use std::{sync::Arc, time::Duration};

use alloy_primitives::U256;
use ledger::{
    adapter::{RailAdapter, StandardRail},
    mock::raw_deposit,
};
use store::db::memory::MemorySetStore;
use types::{
    deposit::{DepositIdSet, DepositWithAvailableLiquidity},
    units::RATE_PRECISION,
};

use crate::engine::{EngineSettings, LiquidityEngine};

mod config;
mod synchronizer;

/// `rate(950)` is 0.95 with 18 decimals.
pub fn rate(thousandths: u64) -> U256 {
    RATE_PRECISION / U256::from(1000u64) * U256::from(thousandths)
}

pub fn deposit(id: u64, depositor: &str, rate: U256, available: u64) -> DepositWithAvailableLiquidity {
    let mut raw = raw_deposit(id, depositor);
    raw.conversion_rate = rate;
    raw.available_liquidity = U256::from(available);
    StandardRail::default().to_deposit(raw).unwrap()
}

pub fn ids(values: &[u64]) -> DepositIdSet {
    values.iter().copied().map(U256::from).collect()
}

pub fn test_engine() -> (LiquidityEngine, Arc<MemorySetStore>) {
    let store = Arc::new(MemorySetStore::new());
    (LiquidityEngine::new(EngineSettings::default(), store.clone()), store)
}

pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
