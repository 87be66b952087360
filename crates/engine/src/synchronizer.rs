//! The fetch, reconcile and publish cycle.
//!
//! A cycle captures the active [`LedgerContext`] when it starts, reads every
//! deposit id below the ledger counter that is not already pruned, and
//! classifies what comes back. Nothing is persisted or published until the
//! whole cycle has run; the commit then happens under a single lock that
//! also re-checks the captured identity and the cycle's sequence number, so
//! a cycle that finishes after a ledger switch or after a newer cycle
//! committed is dropped without side effects.

use std::{
    collections::HashSet,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use alloy_primitives::U256;
use ledger::{adapter::RailAdapter, batch::BatchedReader, ledger::LedgerContext};
use serde::Serialize;
use store::{repository::SetRepository, sets::DepositIdSets};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};
use types::{
    deposit::{DepositId, DepositIdSet, DepositWithAvailableLiquidity, RawDepositRecord},
    errors::LiquidityError,
    live_deposits_metrics, pruned_metrics, sync_cycle_metrics,
};

use crate::store_builder::{DepositStore, RankingPolicy, build_store};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    #[default]
    Idle,
    ComputingRange,
    Fetching,
    Reconciling,
    Published,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub phase: SyncPhase,
    pub identity: Option<String>,
    pub cycles_in_flight: usize,
    pub last_applied_cycle: Option<u64>,
    pub live_deposits: usize,
    pub pruned_deposits: usize,
    pub persistence_degraded: bool,
}

impl SyncStatus {
    /// A ledger is active, so a cycle would have something to read.
    #[must_use]
    pub const fn is_eligible(&self) -> bool {
        self.identity.is_some()
    }

    #[must_use]
    pub const fn is_syncing(&self) -> bool {
        self.cycles_in_flight > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Published {
        cycle: u64,
        live: usize,
        newly_pruned: usize,
    },
    /// Finished after a ledger switch or after a newer cycle committed.
    Stale { cycle: u64 },
    NoLedger,
    Failed { cycle: u64, reason: String },
}

impl CycleOutcome {
    const fn label(&self) -> &'static str {
        match self {
            Self::Published { .. } => "published",
            Self::Stale { .. } => "stale",
            Self::NoLedger => "no_ledger",
            Self::Failed { .. } => "failed",
        }
    }

    #[must_use]
    pub const fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

pub struct SyncSettings {
    pub reader: BatchedReader,
    pub rail: Arc<dyn RailAdapter>,
    pub ranking_policy: RankingPolicy,
}

/// What one cycle learned before it tries to commit.
struct Reconciled {
    live: Vec<DepositWithAvailableLiquidity>,
    exhausted: Vec<DepositId>,
}

// Decrements the in-flight count however the cycle ends, including when its
// task is aborted.
struct InFlight<'a>(&'a watch::Sender<SyncStatus>);

impl<'a> InFlight<'a> {
    fn enter(status: &'a watch::Sender<SyncStatus>) -> Self {
        status.send_modify(|s| s.cycles_in_flight += 1);
        Self(status)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|s| {
            s.cycles_in_flight = s.cycles_in_flight.saturating_sub(1);
            if s.cycles_in_flight == 0 && s.phase != SyncPhase::Published {
                s.phase = SyncPhase::Idle;
            }
        });
    }
}

pub struct Synchronizer {
    settings: SyncSettings,
    repository: SetRepository,
    ledger: RwLock<Option<LedgerContext>>,
    deny_list: RwLock<HashSet<String>>,
    next_cycle: AtomicU64,
    // Commit lock; holds the sequence number of the last committed cycle.
    last_applied: Mutex<u64>,
    store_tx: watch::Sender<Option<Arc<DepositStore>>>,
    status_tx: watch::Sender<SyncStatus>,
}

impl Synchronizer {
    #[must_use]
    pub fn new(settings: SyncSettings, repository: SetRepository) -> Self {
        let (store_tx, _) = watch::channel(None);
        let (status_tx, _) = watch::channel(SyncStatus::default());
        Self {
            settings,
            repository,
            ledger: RwLock::new(None),
            deny_list: RwLock::new(HashSet::new()),
            next_cycle: AtomicU64::new(0),
            last_applied: Mutex::new(0),
            store_tx,
            status_tx,
        }
    }

    #[must_use]
    pub fn rail(&self) -> &dyn RailAdapter {
        self.settings.rail.as_ref()
    }

    #[must_use]
    pub const fn reader(&self) -> &BatchedReader {
        &self.settings.reader
    }

    /// Persistence key of an identity: rails never share sets.
    fn scope(&self, identity: &str) -> String {
        format!("{}_{identity}", self.settings.rail.name())
    }

    #[must_use]
    pub fn current_ledger(&self) -> Option<LedgerContext> {
        self.ledger
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn current_identity(&self) -> Option<String> {
        self.ledger
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|ledger| ledger.identity.clone())
    }

    #[must_use]
    pub fn store(&self) -> Option<Arc<DepositStore>> {
        self.store_tx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe_store(&self) -> watch::Receiver<Option<Arc<DepositStore>>> {
        self.store_tx.subscribe()
    }

    #[must_use]
    pub fn status(&self) -> SyncStatus {
        self.status_tx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status_tx.subscribe()
    }

    /// Replaces the active ledger. A different identity drops the published
    /// store; cycles still running for the old identity will find
    /// themselves stale at commit.
    pub async fn set_ledger(&self, ledger: Option<LedgerContext>) {
        let _commit = self.last_applied.lock().await;

        let identity = ledger.as_ref().map(|l| l.identity.clone());
        let changed = {
            let mut current = self.ledger.write().unwrap_or_else(PoisonError::into_inner);
            let changed = current.as_ref().map(|l| &l.identity) != identity.as_ref();
            *current = ledger;
            changed
        };
        if !changed {
            return;
        }

        info!(identity = ?identity, "Switched active ledger");
        self.store_tx.send_replace(None);
        live_deposits_metrics!(0);

        let pruned = identity
            .as_deref()
            .map_or(0, |identity| self.repository.load(&self.scope(identity)).pruned.len());
        let degraded = self.repository.is_degraded();
        self.status_tx.send_modify(|s| {
            s.identity = identity;
            s.live_deposits = 0;
            s.pruned_deposits = pruned;
            s.persistence_degraded = degraded;
            if s.phase == SyncPhase::Published {
                s.phase = SyncPhase::Idle;
            }
        });
    }

    /// Takes effect on the next published cycle.
    pub fn set_deny_list(&self, payment_identifiers: impl IntoIterator<Item = String>) {
        let deny: HashSet<String> = payment_identifiers.into_iter().collect();
        info!(entries = deny.len(), "Updated deny list");
        *self.deny_list.write().unwrap_or_else(PoisonError::into_inner) = deny;
    }

    #[must_use]
    pub fn targeted_ids(&self) -> DepositIdSet {
        self.current_identity()
            .map(|identity| self.repository.load(&self.scope(&identity)).targeted)
            .unwrap_or_default()
    }

    /// Replaces the targeted set of the active ledger, minus pruned ids.
    pub async fn set_targeted_ids(
        &self,
        ids: impl IntoIterator<Item = DepositId> + Send,
    ) -> Result<DepositIdSet, LiquidityError> {
        let _commit = self.last_applied.lock().await;
        let identity = self
            .current_identity()
            .ok_or_else(|| LiquidityError::Ledger("no active ledger".to_string()))?;

        let ((), sets) = self
            .repository
            .update(&self.scope(&identity), |sets| sets.set_targeted(ids));
        debug!(identity = %identity, targeted = sets.targeted.len(), "Updated targeted deposits");
        Ok(sets.targeted)
    }

    /// Runs one full cycle against the ledger active right now.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let Some(ledger) = self.current_ledger() else {
            debug!("No active ledger, skipping sync cycle");
            sync_cycle_metrics!(CycleOutcome::NoLedger.label());
            return CycleOutcome::NoLedger;
        };

        let cycle = self.next_cycle.fetch_add(1, Ordering::AcqRel) + 1;
        let outcome = {
            let _in_flight = InFlight::enter(&self.status_tx);
            self.sync(cycle, &ledger).await
        };

        match &outcome {
            CycleOutcome::Failed { reason, .. } => {
                warn!(cycle, identity = %ledger.identity, "Sync cycle failed: {reason}");
            }
            CycleOutcome::Stale { .. } => {
                info!(cycle, identity = %ledger.identity, "Dropped stale sync cycle");
            }
            _ => {}
        }
        sync_cycle_metrics!(outcome.label());
        outcome
    }

    fn set_phase(&self, phase: SyncPhase) {
        self.status_tx.send_modify(|s| s.phase = phase);
    }

    async fn sync(&self, cycle: u64, ledger: &LedgerContext) -> CycleOutcome {
        let scope = self.scope(&ledger.identity);
        let reader = &self.settings.reader;

        self.set_phase(SyncPhase::ComputingRange);
        let counter = match reader.fetch_counter(ledger.reader.as_ref()).await {
            Ok(counter) => counter,
            Err(e) => {
                return CycleOutcome::Failed {
                    cycle,
                    reason: e.to_string(),
                };
            }
        };
        let pruned = self.repository.load(&scope).pruned;
        let candidates = match candidate_ids(counter, &pruned) {
            Ok(candidates) => candidates,
            Err(e) => {
                return CycleOutcome::Failed {
                    cycle,
                    reason: e.to_string(),
                };
            }
        };
        debug!(
            cycle,
            identity = %ledger.identity,
            counter = %counter,
            pruned = pruned.len(),
            candidates = candidates.len(),
            "Computed candidate range"
        );

        self.set_phase(SyncPhase::Fetching);
        let mut records = Vec::with_capacity(candidates.len());
        for batch in reader.batches(&candidates) {
            records.extend(reader.fetch_batch(ledger.reader.as_ref(), batch).await);
        }

        self.set_phase(SyncPhase::Reconciling);
        let reconciled = self.classify(cycle, records, &pruned);

        self.commit(cycle, &ledger.identity, &scope, reconciled).await
    }

    fn classify(
        &self,
        cycle: u64,
        records: Vec<RawDepositRecord>,
        pruned: &DepositIdSet,
    ) -> Reconciled {
        let mut reconciled = Reconciled {
            live: Vec::with_capacity(records.len()),
            exhausted: Vec::new(),
        };

        for record in records {
            if pruned.contains(&record.deposit_id) {
                continue;
            }
            match self.settings.rail.to_deposit(record) {
                Ok(deposit) if deposit.is_exhausted() => {
                    reconciled.exhausted.push(deposit.deposit_id);
                }
                Ok(deposit) => reconciled.live.push(deposit),
                Err(e) => warn!(cycle, rail = self.settings.rail.name(), "Skipping deposit: {e}"),
            }
        }
        reconciled
    }

    fn visible(&self, mut live: Vec<DepositWithAvailableLiquidity>) -> Vec<DepositWithAvailableLiquidity> {
        let deny = self.deny_list.read().unwrap_or_else(PoisonError::into_inner);
        if !deny.is_empty() {
            live.retain(|deposit| !deny.contains(&deposit.deposit.payment_identifier));
        }
        live
    }

    async fn commit(
        &self,
        cycle: u64,
        identity: &str,
        scope: &str,
        reconciled: Reconciled,
    ) -> CycleOutcome {
        let mut last_applied = self.last_applied.lock().await;

        if self.current_identity().as_deref() != Some(identity) || cycle <= *last_applied {
            return CycleOutcome::Stale { cycle };
        }

        let Reconciled {
            mut live,
            exhausted,
        } = reconciled;
        let (newly_pruned, sets): (usize, DepositIdSets) = self
            .repository
            .update(scope, |sets| sets.prune(exhausted));
        *last_applied = cycle;

        // An older cycle may have pruned ids this one still read as live.
        live.retain(|deposit| !sets.is_pruned(&deposit.deposit_id));

        let store = build_store(
            self.visible(live),
            self.settings.ranking_policy,
            self.settings.rail.rate_orientation(),
        );
        let live = store.len();
        self.store_tx.send_replace(Some(Arc::new(store)));

        let degraded = self.repository.is_degraded();
        self.status_tx.send_modify(|s| {
            s.phase = SyncPhase::Published;
            s.last_applied_cycle = Some(cycle);
            s.live_deposits = live;
            s.pruned_deposits = sets.pruned.len();
            s.persistence_degraded = degraded;
        });
        pruned_metrics!(newly_pruned);
        live_deposits_metrics!(live);

        info!(
            cycle,
            identity,
            live,
            newly_pruned,
            pruned = sets.pruned.len(),
            targeted = sets.targeted.len(),
            "Published deposit store"
        );
        CycleOutcome::Published {
            cycle,
            live,
            newly_pruned,
        }
    }
}

/// Every id in `[0, counter)` that has not been pruned.
pub fn candidate_ids(counter: U256, pruned: &DepositIdSet) -> Result<Vec<DepositId>, LiquidityError> {
    let end = u64::try_from(counter)
        .map_err(|_| LiquidityError::Ledger(format!("deposit counter {counter} out of range")))?;
    Ok((0..end)
        .map(U256::from)
        .filter(|id| !pruned.contains(id))
        .collect())
}
