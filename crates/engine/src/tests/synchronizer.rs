use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use alloy_primitives::U256;
use assert_matches::assert_matches;
use ledger::{
    ledger::LedgerReader,
    mock::{MockLedger, raw_deposit},
};
use store::db::SetStore;
use tokio::sync::Notify;
use types::{
    deposit::{DepositId, RawDepositRecord},
    errors::LiquidityError,
};

use super::{ids, test_engine, wait_until};
use crate::synchronizer::{CycleOutcome, SyncPhase, candidate_ids};

fn exhausted(id: u64, depositor: &str) -> RawDepositRecord {
    let mut raw = raw_deposit(id, depositor);
    raw.available_liquidity = U256::ZERO;
    raw.remaining_deposit_amount = U256::ZERO;
    raw
}

#[test]
fn test_candidates_skip_pruned_ids() {
    let candidates = candidate_ids(U256::from(5u64), &ids(&[1, 3])).unwrap();
    assert_eq!(candidates, vec![U256::ZERO, U256::from(2u64), U256::from(4u64)]);
    assert!(candidate_ids(U256::ZERO, &ids(&[])).unwrap().is_empty());
    assert!(candidate_ids(U256::MAX, &ids(&[])).is_err());
}

#[tokio::test]
async fn test_exhausted_deposit_is_pruned_and_never_refetched() {
    let (engine, store) = test_engine();
    let ledger = MockLedger::new();
    ledger.upsert_deposit(raw_deposit(0, "0xa"));
    ledger.upsert_deposit(exhausted(1, "0xb"));

    let outcome = engine
        .switch_ledger("0xescrow", Box::new(ledger.clone()))
        .await
        .await
        .unwrap();
    assert_matches!(outcome, CycleOutcome::Published { live: 1, newly_pruned: 1, .. });

    let published = engine.store().unwrap();
    assert_eq!(published.deposit_ids(), vec![U256::ZERO]);
    assert!(store.load("venmo_0xescrow").unwrap().is_pruned(&U256::from(1u64)));

    // Later cycles neither request nor publish the pruned id.
    let before = ledger.requested_batches().len();
    assert!(engine.sync_now().await.is_published());
    let later: Vec<_> = ledger.requested_batches()[before..].concat();
    assert_eq!(later, vec![U256::ZERO]);
    assert!(engine.store().unwrap().get(&U256::from(1u64)).is_none());
}

#[tokio::test]
async fn test_outstanding_intents_keep_empty_deposit_live() {
    let (engine, store) = test_engine();
    let ledger = MockLedger::new();
    let mut reserved = exhausted(0, "0xa");
    reserved.outstanding_intent_amount = U256::from(10u64);
    ledger.upsert_deposit(reserved);

    engine
        .switch_ledger("0xescrow", Box::new(ledger))
        .await
        .await
        .unwrap();

    assert_eq!(engine.store().unwrap().len(), 1);
    assert!(store.load("venmo_0xescrow").unwrap().pruned.is_empty());
}

#[tokio::test]
async fn test_failed_batches_are_retried_not_pruned() {
    let (engine, store) = test_engine();
    let ledger = MockLedger::new();
    ledger.upsert_deposit(exhausted(0, "0xa"));
    ledger.fail_batches_containing(U256::ZERO);

    let outcome = engine
        .switch_ledger("0xescrow", Box::new(ledger.clone()))
        .await
        .await
        .unwrap();
    assert_matches!(outcome, CycleOutcome::Published { live: 0, newly_pruned: 0, .. });
    assert!(store.load("venmo_0xescrow").unwrap().pruned.is_empty());

    ledger.clear_failures();
    assert_matches!(
        engine.sync_now().await,
        CycleOutcome::Published { newly_pruned: 1, .. }
    );
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_batches_are_not_pruned() {
    let (engine, store) = test_engine();
    let ledger = MockLedger::new();
    ledger.upsert_deposit(exhausted(0, "0xa"));
    ledger.set_delay(Some(Duration::from_secs(3600)));

    engine
        .switch_ledger("0xescrow", Box::new(ledger))
        .await
        .await
        .unwrap();

    assert!(store.load("venmo_0xescrow").unwrap().pruned.is_empty());
}

#[tokio::test]
async fn test_malformed_records_are_skipped_not_pruned() {
    let (engine, store) = test_engine();
    let ledger = MockLedger::new();
    let mut broken = exhausted(0, "0xa");
    broken.conversion_rate = U256::ZERO;
    ledger.upsert_deposit(broken);
    ledger.upsert_deposit(raw_deposit(1, ""));
    ledger.upsert_deposit(raw_deposit(2, "0xc"));

    let outcome = engine
        .switch_ledger("0xescrow", Box::new(ledger))
        .await
        .await
        .unwrap();

    assert_matches!(outcome, CycleOutcome::Published { live: 1, newly_pruned: 0, .. });
    assert!(store.load("venmo_0xescrow").unwrap().pruned.is_empty());
}

#[tokio::test]
async fn test_counter_failure_keeps_previous_store() {
    let (engine, _store) = test_engine();
    let ledger = MockLedger::new();
    ledger.upsert_deposit(raw_deposit(0, "0xa"));
    engine
        .switch_ledger("0xescrow", Box::new(ledger.clone()))
        .await
        .await
        .unwrap();

    ledger.fail_counter_reads();
    assert_matches!(engine.sync_now().await, CycleOutcome::Failed { .. });
    assert_eq!(engine.store().unwrap().len(), 1);
    assert_eq!(engine.status().phase, SyncPhase::Idle);
}

#[tokio::test]
async fn test_pruning_removes_targeted_ids_in_same_update() {
    let (engine, store) = test_engine();
    let ledger = MockLedger::new();
    ledger.upsert_deposit(raw_deposit(0, "0xa"));
    ledger.upsert_deposit(raw_deposit(1, "0xb"));
    engine
        .switch_ledger("0xescrow", Box::new(ledger.clone()))
        .await
        .await
        .unwrap();
    engine.set_targeted_ids(ids(&[0, 1])).await.unwrap();

    ledger.upsert_deposit(exhausted(1, "0xb"));
    assert!(engine.sync_now().await.is_published());

    let persisted = store.load("venmo_0xescrow").unwrap();
    assert_eq!(persisted.targeted, ids(&[0]));
    assert!(persisted.pruned.contains(&U256::from(1u64)));
    assert_eq!(engine.get_targeted_ids(), ids(&[0]));
}

#[tokio::test]
async fn test_stale_cycle_for_previous_ledger_is_dropped() {
    let (engine, store) = test_engine();

    let (ledger_a, gate) = MockLedger::gated();
    ledger_a.upsert_deposit(exhausted(0, "0xa"));
    ledger_a.upsert_deposit(raw_deposit(1, "0xa"));
    let cycle_a = engine.switch_ledger("0xA", Box::new(ledger_a.clone())).await;
    wait_until(|| !ledger_a.requested_batches().is_empty()).await;
    assert!(engine.is_syncing());

    let ledger_b = MockLedger::new();
    ledger_b.upsert_deposit(raw_deposit(0, "0xb"));
    let cycle_b = engine.switch_ledger("0xB", Box::new(ledger_b)).await;
    assert!(cycle_b.await.unwrap().is_published());

    gate.notify_one();
    assert_matches!(cycle_a.await.unwrap(), CycleOutcome::Stale { .. });

    // Nothing from A was persisted or published.
    assert!(store.load("venmo_0xA").unwrap().pruned.is_empty());
    let published = engine.store().unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published.iter().next().unwrap().depositor_identity, "0xb");
    assert_eq!(engine.status().identity.as_deref(), Some("0xB"));
    assert!(!engine.is_syncing());
}

#[tokio::test]
async fn test_older_cycle_finishing_last_is_dropped() {
    let (engine, _store) = test_engine();
    let ledger = MockLedger::new();
    ledger.upsert_deposit(raw_deposit(0, "0xa"));
    engine
        .switch_ledger("0xescrow", Box::new(ledger.clone()))
        .await
        .await
        .unwrap();

    ledger.set_delay(Some(Duration::from_millis(300)));
    let slow = engine.refetch();
    wait_until(|| ledger.requested_batches().len() == 2).await;
    ledger.set_delay(None);

    ledger.upsert_deposit(raw_deposit(1, "0xb"));
    assert_matches!(engine.sync_now().await, CycleOutcome::Published { live: 2, .. });

    assert_matches!(slow.await.unwrap(), CycleOutcome::Stale { .. });
    assert_eq!(engine.store().unwrap().len(), 2);
}

/// Single-deposit ledger whose first read waits before looking at the
/// deposit and whose second read looks first and then waits.
#[derive(Clone)]
struct InterleavedLedger {
    record: Arc<Mutex<RawDepositRecord>>,
    reads: Arc<AtomicUsize>,
    first: Arc<Notify>,
    second: Arc<Notify>,
}

impl InterleavedLedger {
    fn new(record: RawDepositRecord) -> Self {
        Self {
            record: Arc::new(Mutex::new(record)),
            reads: Arc::default(),
            first: Arc::default(),
            second: Arc::default(),
        }
    }

    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn replace(&self, record: RawDepositRecord) {
        *self.record.lock().unwrap() = record;
    }
}

#[async_trait::async_trait]
impl LedgerReader for InterleavedLedger {
    async fn get_deposit_counter(&self) -> Result<U256, LiquidityError> {
        Ok(U256::from(1u64))
    }

    async fn get_deposits_by_ids(
        &self,
        _ids: &[DepositId],
    ) -> Result<Vec<RawDepositRecord>, LiquidityError> {
        let (read, snapshot) = {
            let record = self.record.lock().unwrap();
            (self.reads.fetch_add(1, Ordering::SeqCst), record.clone())
        };
        if read == 0 {
            self.first.notified().await;
            return Ok(vec![self.record.lock().unwrap().clone()]);
        }
        self.second.notified().await;
        Ok(vec![snapshot])
    }
}

#[tokio::test]
async fn test_newer_cycle_never_republishes_id_pruned_by_older_cycle() {
    let (engine, store) = test_engine();
    let ledger = InterleavedLedger::new(raw_deposit(0, "0xa"));

    let older = engine.switch_ledger("0xescrow", Box::new(ledger.clone())).await;
    wait_until(|| ledger.reads() == 1).await;
    let newer = engine.refetch();
    wait_until(|| ledger.reads() == 2).await;

    // The newer cycle already holds a live copy; the older one will see the
    // deposit filled.
    ledger.replace(exhausted(0, "0xa"));
    ledger.first.notify_one();
    assert_matches!(
        older.await.unwrap(),
        CycleOutcome::Published { cycle: 1, live: 0, newly_pruned: 1 }
    );

    ledger.second.notify_one();
    assert_matches!(
        newer.await.unwrap(),
        CycleOutcome::Published { cycle: 2, live: 0, newly_pruned: 0 }
    );

    assert!(engine.store().unwrap().is_empty());
    assert_eq!(engine.status().live_deposits, 0);
    assert!(store.load("venmo_0xescrow").unwrap().is_pruned(&U256::ZERO));
}

#[tokio::test]
async fn test_deny_list_hides_without_pruning() {
    let (engine, store) = test_engine();
    let ledger = MockLedger::new();
    ledger.upsert_deposit(raw_deposit(0, "0xa"));
    ledger.upsert_deposit(raw_deposit(1, "0xbad"));
    engine.set_deny_list(["pay:0xbad".to_string()]);

    engine
        .switch_ledger("0xescrow", Box::new(ledger))
        .await
        .await
        .unwrap();
    assert_eq!(engine.store().unwrap().deposit_ids(), vec![U256::ZERO]);
    assert!(store.load("venmo_0xescrow").unwrap().pruned.is_empty());

    engine.set_deny_list(Vec::new());
    engine.sync_now().await;
    assert_eq!(engine.store().unwrap().len(), 2);
}

#[tokio::test]
async fn test_persisted_pruned_ids_survive_engine_restart() {
    let (engine, store) = test_engine();
    let ledger = MockLedger::new();
    ledger.upsert_deposit(exhausted(0, "0xa"));
    ledger.upsert_deposit(raw_deposit(1, "0xb"));
    engine
        .switch_ledger("0xescrow", Box::new(ledger.clone()))
        .await
        .await
        .unwrap();

    let restarted = crate::LiquidityEngine::new(Default::default(), Arc::clone(&store) as Arc<dyn SetStore>);
    let before = ledger.requested_batches().len();
    restarted
        .switch_ledger("0xescrow", Box::new(ledger.clone()))
        .await
        .await
        .unwrap();

    let later: Vec<_> = ledger.requested_batches()[before..].concat();
    assert_eq!(later, vec![U256::from(1u64)]);
    assert_eq!(restarted.status().pruned_deposits, 1);
}
