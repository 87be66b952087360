use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use tracing::{error, warn};

use crate::db::SetStore;
use crate::sets::DepositIdSets;

/// Cached access to a [`SetStore`] that never fails.
///
/// The first storage error switches the repository to memory-only for the
/// rest of the session: scopes that were never loaded start empty and
/// nothing more is written. Starting empty only means re-fetching deposits
/// that were pruned before, never skipping live ones.
pub struct SetRepository {
    store: Arc<dyn SetStore>,
    cache: Mutex<HashMap<String, DepositIdSets>>,
    // Serializes read-modify-write cycles.
    writer: Mutex<()>,
    degraded: AtomicBool,
}

impl SetRepository {
    pub fn new(store: Arc<dyn SetStore>) -> Self {
        Self {
            store,
            cache: Mutex::new(HashMap::new()),
            writer: Mutex::new(()),
            degraded: AtomicBool::new(false),
        }
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, DepositIdSets>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    fn degrade(&self, scope: &str, context: &str, e: &dyn std::error::Error) {
        if self.degraded.swap(true, Ordering::AcqRel) {
            warn!(scope, "Failed to {context} deposit id sets: {e}");
        } else {
            error!(
                scope,
                "Failed to {context} deposit id sets, continuing in memory only: {e}"
            );
        }
    }

    pub fn load(&self, scope: &str) -> DepositIdSets {
        if let Some(sets) = self.cache().get(scope) {
            return sets.clone();
        }

        let sets = if self.is_degraded() {
            DepositIdSets::default()
        } else {
            match self.store.load(scope) {
                Ok(sets) => sets,
                Err(e) => {
                    self.degrade(scope, "load", &e);
                    DepositIdSets::default()
                }
            }
        };

        self.cache()
            .entry(scope.to_string())
            .or_insert(sets)
            .clone()
    }

    /// Loads, applies `update` and saves while holding the writer lock, so
    /// concurrent updates of one scope never lose each other's ids. This is
    /// the only write path.
    pub fn update<R>(
        &self,
        scope: &str,
        update: impl FnOnce(&mut DepositIdSets) -> R,
    ) -> (R, DepositIdSets) {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut sets = self.load(scope);
        let result = update(&mut sets);
        self.persist(scope, &sets);
        (result, sets)
    }

    fn persist(&self, scope: &str, sets: &DepositIdSets) {
        self.cache().insert(scope.to_string(), sets.clone());

        if self.is_degraded() {
            return;
        }
        if let Err(e) = self.store.save(scope, sets) {
            self.degrade(scope, "save", &e);
        }
    }
}
