use std::sync::Arc;

use alloy_primitives::U256;
use ledger::{
    adapter::StandardRail,
    batch::BatchedReader,
    ledger::{LedgerContext, LedgerReader},
};
use store::{
    db::{SetStore, rocksdb::RocksSetStore},
    repository::SetRepository,
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::info;
use types::{
    deposit::{DepositId, DepositIdSet},
    errors::LiquidityError,
    quote::IndicativeQuote,
    units::{RateOrientation, SETTLEMENT_UNIT},
};

use crate::{
    config::EngineConfig,
    matcher::{QuoteFilter, match_max_available, match_quote},
    store_builder::{DepositStore, RankingPolicy},
    synchronizer::{CycleOutcome, SyncSettings, SyncStatus, Synchronizer},
};

pub struct EngineSettings {
    pub sync: SyncSettings,
    /// Settlement units a single transfer may move.
    pub max_transfer_size: U256,
    pub deny_list: Vec<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sync: SyncSettings {
                reader: BatchedReader::default(),
                rail: Arc::new(StandardRail::default()),
                ranking_policy: RankingPolicy::default(),
            },
            max_transfer_size: SETTLEMENT_UNIT * U256::from(250u64),
            deny_list: Vec::new(),
        }
    }
}

/// Cloneable handle to one synchronization pipeline and its published
/// store. Quotes are answered from the last published store and never wait
/// on a running cycle.
#[derive(Clone)]
pub struct LiquidityEngine {
    sync: Arc<Synchronizer>,
    max_transfer_size: U256,
}

impl LiquidityEngine {
    #[must_use]
    pub fn new(settings: EngineSettings, store: Arc<dyn SetStore>) -> Self {
        let sync = Synchronizer::new(settings.sync, SetRepository::new(store));
        sync.set_deny_list(settings.deny_list);
        Self {
            sync: Arc::new(sync),
            max_transfer_size: settings.max_transfer_size,
        }
    }

    /// Engine persisting its id sets in RocksDB under the configured
    /// database directory.
    pub fn from_config(config: &EngineConfig) -> Result<Self, LiquidityError> {
        let settings = config.engine_settings()?;
        let store = RocksSetStore::new(&config.database_directory)?;
        info!(
            rail = %config.rail,
            database = %config.database_directory.display(),
            "Liquidity engine ready"
        );
        Ok(Self::new(settings, Arc::new(store)))
    }

    fn orientation(&self) -> RateOrientation {
        self.sync.rail().rate_orientation()
    }

    /// Makes `identity` the active ledger and starts a cycle for it.
    pub async fn switch_ledger(
        &self,
        identity: impl Into<String>,
        reader: Box<dyn LedgerReader>,
    ) -> JoinHandle<CycleOutcome> {
        self.sync
            .set_ledger(Some(LedgerContext::new(identity, reader)))
            .await;
        self.refetch()
    }

    /// Drops the active ledger; quotes report an empty store until the next
    /// switch.
    pub async fn clear_ledger(&self) {
        self.sync.set_ledger(None).await;
    }

    #[must_use]
    pub fn current_ledger(&self) -> Option<LedgerContext> {
        self.sync.current_ledger()
    }

    /// Reads the counter of `ledger` under the same timeout as deposit reads.
    pub async fn fetch_counter(&self, ledger: &LedgerContext) -> Result<U256, LiquidityError> {
        self.sync.reader().fetch_counter(ledger.reader.as_ref()).await
    }

    /// Starts a new cycle in the background. The handle may be dropped.
    pub fn refetch(&self) -> JoinHandle<CycleOutcome> {
        let sync = self.sync.clone();
        tokio::spawn(async move { sync.run_cycle().await })
    }

    /// Runs a cycle on the caller's task.
    pub async fn sync_now(&self) -> CycleOutcome {
        self.sync.run_cycle().await
    }

    /// `restrict_to` of `None` uses the persisted targeted set; an empty set
    /// means the whole store.
    #[must_use]
    pub fn get_quote(
        &self,
        requested_amount: &str,
        exclude_depositor: &str,
        restrict_to: Option<&DepositIdSet>,
    ) -> IndicativeQuote {
        let targeted;
        let restrict_to = match restrict_to {
            Some(ids) => ids,
            None => {
                targeted = self.get_targeted_ids();
                &targeted
            }
        };
        let store = self.store();
        match_quote(
            store.as_deref(),
            requested_amount,
            QuoteFilter {
                exclude_depositor,
                restrict_to,
            },
            self.orientation(),
        )
    }

    #[must_use]
    pub fn get_quote_for_max_available(
        &self,
        exclude_depositor: &str,
        restrict_to: Option<&DepositIdSet>,
    ) -> IndicativeQuote {
        let targeted;
        let restrict_to = match restrict_to {
            Some(ids) => ids,
            None => {
                targeted = self.get_targeted_ids();
                &targeted
            }
        };
        let store = self.store();
        match_max_available(
            store.as_deref(),
            self.max_transfer_size,
            QuoteFilter {
                exclude_depositor,
                restrict_to,
            },
            self.orientation(),
        )
    }

    /// Persists `ids` as the targeted set of the active ledger. Pruned ids
    /// are dropped; the stored set is returned.
    pub async fn set_targeted_ids(
        &self,
        ids: impl IntoIterator<Item = DepositId> + Send,
    ) -> Result<DepositIdSet, LiquidityError> {
        self.sync.set_targeted_ids(ids).await
    }

    #[must_use]
    pub fn get_targeted_ids(&self) -> DepositIdSet {
        self.sync.targeted_ids()
    }

    pub fn set_deny_list(&self, payment_identifiers: impl IntoIterator<Item = String>) {
        self.sync.set_deny_list(payment_identifiers);
    }

    #[must_use]
    pub fn store(&self) -> Option<Arc<DepositStore>> {
        self.sync.store()
    }

    #[must_use]
    pub fn subscribe_store(&self) -> watch::Receiver<Option<Arc<DepositStore>>> {
        self.sync.subscribe_store()
    }

    #[must_use]
    pub fn status(&self) -> SyncStatus {
        self.sync.status()
    }

    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.sync.subscribe_status()
    }

    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.status().is_eligible()
    }

    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.status().is_syncing()
    }

    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.store().is_some()
    }
}
