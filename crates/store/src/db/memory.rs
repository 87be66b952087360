use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use types::errors::LiquidityError;

use crate::db::SetStore;
use crate::sets::DepositIdSets;

/// Process-local store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemorySetStore {
    scopes: Mutex<HashMap<String, DepositIdSets>>,
}

impl MemorySetStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SetStore for MemorySetStore {
    fn load(&self, scope: &str) -> Result<DepositIdSets, LiquidityError> {
        Ok(self
            .scopes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(scope)
            .cloned()
            .unwrap_or_default())
    }

    fn save(&self, scope: &str, sets: &DepositIdSets) -> Result<(), LiquidityError> {
        self.scopes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(scope.to_string(), sets.clone());
        Ok(())
    }
}
