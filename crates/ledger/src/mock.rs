use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use alloy_primitives::U256;
use tokio::sync::Notify;
use tracing::info;
use types::{
    deposit::{DepositId, RawDepositRecord},
    errors::LiquidityError,
};

use crate::ledger::LedgerReader;

#[derive(Default)]
struct MockState {
    counter: U256,
    deposits: BTreeMap<DepositId, RawDepositRecord>,
    // Any batch containing one of these ids fails.
    failing_ids: HashSet<DepositId>,
    fail_counter: bool,
    delay: Option<Duration>,
    requested_batches: Vec<Vec<DepositId>>,
}

/// In-memory ledger for tests and local runs.
///
/// Clones share state, so a test can keep a handle and mutate deposits
/// after handing a boxed clone to the engine.
#[derive(Clone, Default)]
pub struct MockLedger {
    state: Arc<Mutex<MockState>>,
    gate: Option<Arc<Notify>>,
}

impl MockLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger whose deposit reads block until [`Notify::notify_one`] is
    /// called on the returned handle, once per read.
    #[must_use]
    pub fn gated() -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        (
            Self {
                state: Arc::default(),
                gate: Some(gate.clone()),
            },
            gate,
        )
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts or replaces a deposit and bumps the counter past its id.
    pub fn upsert_deposit(&self, record: RawDepositRecord) {
        let mut state = self.state();
        let next = record.deposit_id + U256::from(1u64);
        if next > state.counter {
            state.counter = next;
        }
        state.deposits.insert(record.deposit_id, record);
    }

    pub fn set_counter(&self, counter: U256) {
        self.state().counter = counter;
    }

    pub fn fail_batches_containing(&self, id: DepositId) {
        self.state().failing_ids.insert(id);
    }

    pub fn clear_failures(&self) {
        let mut state = self.state();
        state.failing_ids.clear();
        state.fail_counter = false;
    }

    pub fn fail_counter_reads(&self) {
        self.state().fail_counter = true;
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state().delay = delay;
    }

    /// Every id list passed to `get_deposits_by_ids`, in call order.
    #[must_use]
    pub fn requested_batches(&self) -> Vec<Vec<DepositId>> {
        self.state().requested_batches.clone()
    }
}

#[async_trait::async_trait]
impl LedgerReader for MockLedger {
    async fn get_deposit_counter(&self) -> Result<U256, LiquidityError> {
        let state = self.state();
        if state.fail_counter {
            return Err(LiquidityError::Ledger("counter read failed".to_string()));
        }
        Ok(state.counter)
    }

    async fn get_deposits_by_ids(
        &self,
        ids: &[DepositId],
    ) -> Result<Vec<RawDepositRecord>, LiquidityError> {
        let delay = {
            let mut state = self.state();
            state.requested_batches.push(ids.to_vec());
            state.delay
        };

        if let Some(gate) = &self.gate {
            info!("Mock ledger holding batch of {} ids", ids.len());
            gate.notified().await;
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state();
        if ids.iter().any(|id| state.failing_ids.contains(id)) {
            return Err(LiquidityError::Ledger("batch read reverted".to_string()));
        }

        Ok(ids
            .iter()
            .filter_map(|id| state.deposits.get(id).cloned())
            .collect())
    }
}

/// A live 100-token deposit at a 1:1 rate, for tests to adjust.
#[must_use]
pub fn raw_deposit(id: u64, depositor: &str) -> RawDepositRecord {
    let amount = U256::from(100_000_000u64);
    RawDepositRecord {
        deposit_id: U256::from(id),
        depositor: depositor.to_string(),
        depositor_id_hash: Some(format!("hash:{depositor}")),
        payment_identifier: format!("pay:{depositor}"),
        deposit_amount: amount,
        remaining_deposit_amount: amount,
        outstanding_intent_amount: U256::ZERO,
        conversion_rate: types::units::RATE_PRECISION,
        intent_hashes: Vec::new(),
        available_liquidity: amount,
    }
}
